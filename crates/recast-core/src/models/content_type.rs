use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// The kinds of artifacts a job can request.
///
/// Partitioned into two families: text posts (one per platform) and images
/// (a generic thumbnail plus per-platform image variants). Each kind maps to
/// exactly one generation strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Twitter,
    Instagram,
    Linkedin,
    Facebook,
    Thumbnail,
    TwitterImage,
    InstagramImage,
    LinkedinImage,
    FacebookImage,
}

impl ContentType {
    /// True for kinds produced by the image pipeline (prompt derivation,
    /// image provider call, storage sink write).
    pub fn is_image(&self) -> bool {
        matches!(
            self,
            ContentType::Thumbnail
                | ContentType::TwitterImage
                | ContentType::InstagramImage
                | ContentType::LinkedinImage
                | ContentType::FacebookImage
        )
    }

    /// The social platform a kind targets, if any. `Thumbnail` is generic.
    pub fn platform(&self) -> Option<&'static str> {
        match self {
            ContentType::Twitter | ContentType::TwitterImage => Some("twitter"),
            ContentType::Instagram | ContentType::InstagramImage => Some("instagram"),
            ContentType::Linkedin | ContentType::LinkedinImage => Some("linkedin"),
            ContentType::Facebook | ContentType::FacebookImage => Some("facebook"),
            ContentType::Thumbnail => None,
        }
    }

    /// Storage folder hint for image kinds.
    pub fn storage_folder(&self) -> &'static str {
        match self {
            ContentType::Thumbnail => "thumbnails",
            ContentType::TwitterImage => "twitter_images",
            ContentType::InstagramImage => "instagram_images",
            ContentType::LinkedinImage => "linkedin_images",
            ContentType::FacebookImage => "facebook_images",
            _ => "text",
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ContentType::Twitter => write!(f, "twitter"),
            ContentType::Instagram => write!(f, "instagram"),
            ContentType::Linkedin => write!(f, "linkedin"),
            ContentType::Facebook => write!(f, "facebook"),
            ContentType::Thumbnail => write!(f, "thumbnail"),
            ContentType::TwitterImage => write!(f, "twitter_image"),
            ContentType::InstagramImage => write!(f, "instagram_image"),
            ContentType::LinkedinImage => write!(f, "linkedin_image"),
            ContentType::FacebookImage => write!(f, "facebook_image"),
        }
    }
}

impl FromStr for ContentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "twitter" => Ok(ContentType::Twitter),
            "instagram" => Ok(ContentType::Instagram),
            "linkedin" => Ok(ContentType::Linkedin),
            "facebook" => Ok(ContentType::Facebook),
            "thumbnail" => Ok(ContentType::Thumbnail),
            "twitter_image" => Ok(ContentType::TwitterImage),
            "instagram_image" => Ok(ContentType::InstagramImage),
            "linkedin_image" => Ok(ContentType::LinkedinImage),
            "facebook_image" => Ok(ContentType::FacebookImage),
            _ => Err(anyhow::anyhow!("Invalid content type: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_display_round_trip() {
        let all = [
            ContentType::Twitter,
            ContentType::Instagram,
            ContentType::Linkedin,
            ContentType::Facebook,
            ContentType::Thumbnail,
            ContentType::TwitterImage,
            ContentType::InstagramImage,
            ContentType::LinkedinImage,
            ContentType::FacebookImage,
        ];
        for ct in all {
            assert_eq!(ct.to_string().parse::<ContentType>().unwrap(), ct);
        }
        assert!("tiktok".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_family_partition() {
        assert!(!ContentType::Twitter.is_image());
        assert!(!ContentType::Linkedin.is_image());
        assert!(ContentType::Thumbnail.is_image());
        assert!(ContentType::InstagramImage.is_image());
    }

    #[test]
    fn test_platform() {
        assert_eq!(ContentType::Twitter.platform(), Some("twitter"));
        assert_eq!(ContentType::TwitterImage.platform(), Some("twitter"));
        assert_eq!(ContentType::Thumbnail.platform(), None);
    }

    #[test]
    fn test_storage_folder() {
        assert_eq!(ContentType::Thumbnail.storage_folder(), "thumbnails");
        assert_eq!(ContentType::FacebookImage.storage_folder(), "facebook_images");
    }
}
