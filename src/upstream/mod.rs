//! Upstream module - ModelArk wire types, provider trait and HTTP client

pub mod ark;
pub mod traits;

pub use ark::ArkClient;
pub use traits::{
    ArkError, ArkImageData, ArkImageRequest, ArkImageResponse, ArkUsage, FetchedImage,
    ImageInput, ImageProvider, SequentialOptions,
};
