mod asset_index;

pub use asset_index::{
    index_relative_path, object_relative_path, object_url, AssetIndex, AssetObject, RESOURCES_URL,
};
