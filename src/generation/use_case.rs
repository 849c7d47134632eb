//! Selection of the generation use case from the request shape

use serde::{Deserialize, Serialize};
use std::fmt;

use super::request::UnifiedGenerationRequest;

/// The five request shapes the provider supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UseCase {
    /// Prompt only, one image
    #[serde(rename = "text2img_single")]
    Text2ImgSingle,
    /// Prompt only, a coherent series
    #[serde(rename = "text2img_multiple")]
    Text2ImgMultiple,
    /// One reference image, one result
    #[serde(rename = "img2img_single")]
    Img2ImgSingle,
    /// One reference image expanded into a series
    #[serde(rename = "img2img_expand")]
    Img2ImgExpand,
    /// Several reference images combined
    #[serde(rename = "img2img_multiple_refs")]
    Img2ImgMultipleRefs,
}

impl UseCase {
    pub fn classify(request: &UnifiedGenerationRequest) -> Self {
        match (request.image_count(), request.is_sequential()) {
            (0, false) => UseCase::Text2ImgSingle,
            (0, true) => UseCase::Text2ImgMultiple,
            (1, false) => UseCase::Img2ImgSingle,
            (1, true) => UseCase::Img2ImgExpand,
            _ => UseCase::Img2ImgMultipleRefs,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UseCase::Text2ImgSingle => "text2img_single",
            UseCase::Text2ImgMultiple => "text2img_multiple",
            UseCase::Img2ImgSingle => "img2img_single",
            UseCase::Img2ImgExpand => "img2img_expand",
            UseCase::Img2ImgMultipleRefs => "img2img_multiple_refs",
        }
    }

    /// Dashboard label
    pub fn label(&self) -> &'static str {
        match self {
            UseCase::Text2ImgSingle => "Text2Img (Single Image)",
            UseCase::Text2ImgMultiple => "Text2Img (Multiple Images)",
            UseCase::Img2ImgSingle => "Img2Img (Single Reference)",
            UseCase::Img2ImgExpand => "Img2Img (Expand to Multiple)",
            UseCase::Img2ImgMultipleRefs => "Img2Img (Multiple References)",
        }
    }
}

impl fmt::Display for UseCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
