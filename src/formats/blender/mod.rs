pub mod custom_data;

pub use custom_data::{read_layer, CustomDataType, Layer, AUTO_FROM_NAME, REGISTRY};
