//! Image model catalog and name resolution.

use serde::Serialize;

use crate::upload::UploadStrategy;

pub const DEFAULT_IMAGE_MODEL: &str = "kie_nano_banana_pro";

/// How a model expects `W:H` aspect ratios to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectFormat {
    /// `16:9`
    Colon,
    /// `16-9`
    Dash,
}

/// Static capabilities of one upstream image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageModel {
    pub id: &'static str,
    pub gen_type: &'static str,
    pub model: &'static str,
    #[serde(rename = "supportsI2i")]
    pub supports_i2i: bool,
    pub aspect_format: AspectFormat,
    pub supports_resolution: bool,
    pub upload: UploadStrategy,
    pub aliases: &'static [&'static str],
}

pub const CATALOG: &[ImageModel] = &[
    ImageModel {
        id: "kie_nano_banana_pro",
        gen_type: "kie_nano_banana_pro",
        model: "kie_nano_banana_pro",
        supports_i2i: true,
        aspect_format: AspectFormat::Colon,
        supports_resolution: true,
        upload: UploadStrategy::Signed,
        aliases: &["dall-e-3", "nano-banana-pro"],
    },
    ImageModel {
        id: "kie_nano_banana",
        gen_type: "kie_nano_banana",
        model: "kie_nano_banana",
        supports_i2i: true,
        aspect_format: AspectFormat::Colon,
        supports_resolution: true,
        upload: UploadStrategy::PublicHost,
        aliases: &["dall-e-2", "nano-banana"],
    },
    ImageModel {
        id: "wf_art",
        gen_type: "wf_art",
        model: "wf_art",
        supports_i2i: false,
        aspect_format: AspectFormat::Dash,
        supports_resolution: false,
        upload: UploadStrategy::PublicHost,
        aliases: &["ai-ease", "aiease"],
    },
    ImageModel {
        id: "see_dream_img",
        gen_type: "see_dream_img",
        model: "see_dream_img",
        supports_i2i: true,
        aspect_format: AspectFormat::Colon,
        supports_resolution: true,
        upload: UploadStrategy::PublicHost,
        aliases: &["seedream-4.0", "seedream-4"],
    },
    ImageModel {
        id: "doubao-seedream-4.5",
        gen_type: "volces_img",
        model: "doubao-seedream-4.5",
        supports_i2i: true,
        aspect_format: AspectFormat::Colon,
        supports_resolution: true,
        upload: UploadStrategy::Signed,
        aliases: &["seedream-4.5", "seedream"],
    },
];

impl ImageModel {
    /// Resolve a catalog id or alias. Unknown names get the default model.
    pub fn resolve(name: &str) -> &'static ImageModel {
        let name = name.trim();
        CATALOG
            .iter()
            .find(|m| m.id == name || m.aliases.contains(&name))
            .unwrap_or_else(Self::default_model)
    }

    pub fn default_model() -> &'static ImageModel {
        &CATALOG[0]
    }

    pub fn format_aspect(&self, aspect_ratio: &str) -> String {
        match self.aspect_format {
            AspectFormat::Colon => aspect_ratio.to_string(),
            AspectFormat::Dash => aspect_ratio.replace(':', "-"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_first_entry() {
        assert_eq!(ImageModel::default_model().id, DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn resolves_ids_and_aliases() {
        assert_eq!(ImageModel::resolve("wf_art").id, "wf_art");
        assert_eq!(ImageModel::resolve("dall-e-3").id, "kie_nano_banana_pro");
        assert_eq!(ImageModel::resolve("dall-e-2").id, "kie_nano_banana");
        assert_eq!(ImageModel::resolve("aiease").id, "wf_art");
        assert_eq!(ImageModel::resolve("seedream-4").id, "see_dream_img");
        assert_eq!(ImageModel::resolve("seedream").id, "doubao-seedream-4.5");
    }

    #[test]
    fn unknown_names_fall_back() {
        assert_eq!(ImageModel::resolve("midjourney").id, DEFAULT_IMAGE_MODEL);
        assert_eq!(ImageModel::resolve("").id, DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn seedream_45_uses_volces_gen_type() {
        let m = ImageModel::resolve("doubao-seedream-4.5");
        assert_eq!(m.gen_type, "volces_img");
        assert_eq!(m.model, "doubao-seedream-4.5");
    }

    #[test]
    fn aspect_formatting() {
        assert_eq!(ImageModel::resolve("wf_art").format_aspect("16:9"), "16-9");
        assert_eq!(
            ImageModel::resolve("kie_nano_banana").format_aspect("16:9"),
            "16:9"
        );
    }

    #[test]
    fn ids_are_unique_and_aliases_do_not_collide() {
        let mut names: Vec<&str> = CATALOG
            .iter()
            .flat_map(|m| std::iter::once(m.id).chain(m.aliases.iter().copied()))
            .collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn catalog_serializes_capabilities() {
        let json = serde_json::to_value(ImageModel::resolve("wf_art")).unwrap();
        assert_eq!(json["supportsI2i"], false);
        assert_eq!(json["aspectFormat"], "dash");
        assert_eq!(json["upload"], "public_host");
    }
}
