//! Static classification tables
//!
//! Attachment categories, superstar kinds, inbox categories, `is:` and `in:`
//! vocabularies. All lookups are case-insensitive on the query side; label
//! names are compared upper-cased.

use serde::{Deserialize, Serialize};

/// Labels that never count as user labels
pub const SYSTEM_LABELS: &[&str] = &[
    "INBOX", "SENT", "DRAFT", "TRASH", "SPAM", "UNREAD", "STARRED", "IMPORTANT",
];

/// Labels that make a record `is:starred`
pub const STARRED_LABELS: &[&str] = &[
    "STARRED",
    "YELLOW_STAR",
    "ORANGE_STAR",
    "RED_STAR",
    "PURPLE_STAR",
    "BLUE_STAR",
    "GREEN_STAR",
];

pub const UNREAD_LABEL: &str = "UNREAD";
pub const IMPORTANT_LABEL: &str = "IMPORTANT";

#[must_use]
pub fn is_system_label(label: &str) -> bool {
    SYSTEM_LABELS.iter().any(|s| s.eq_ignore_ascii_case(label))
}

// ── Attachment categories ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentCategory {
    Youtube,
    Spreadsheet,
    Presentation,
    Document,
    Drive,
    Pdf,
    Image,
    Video,
    Audio,
}

impl AttachmentCategory {
    /// Every category, in classification priority order
    pub const ALL: [Self; 9] = [
        Self::Youtube,
        Self::Spreadsheet,
        Self::Presentation,
        Self::Document,
        Self::Drive,
        Self::Pdf,
        Self::Image,
        Self::Video,
        Self::Audio,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Spreadsheet => "spreadsheet",
            Self::Presentation => "presentation",
            Self::Document => "document",
            Self::Drive => "drive",
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
    }

    /// Classify one part. The first matching row wins, so every part lands in
    /// at most one category and a YouTube container is never `video`.
    #[must_use]
    pub fn classify(mime_type: &str, filename: &str) -> Option<Self> {
        let mime = mime_type.to_ascii_lowercase();
        let name = filename.to_ascii_lowercase();
        let ext = |exts: &[&str]| {
            exts.iter()
                .any(|e| name.rsplit_once('.').is_some_and(|(_, x)| x == *e))
        };

        if mime.contains("youtube") || name.contains("youtube") {
            Some(Self::Youtube)
        } else if mime.contains("spreadsheetml")
            || mime.contains("vnd.google-apps.spreadsheet")
            || mime.contains("ms-excel")
            || mime == "text/csv"
            || ext(&["xls", "xlsx", "csv"])
        {
            Some(Self::Spreadsheet)
        } else if mime.contains("presentationml")
            || mime.contains("vnd.google-apps.presentation")
            || mime.contains("ms-powerpoint")
            || ext(&["ppt", "pptx"])
        {
            Some(Self::Presentation)
        } else if mime.contains("wordprocessingml")
            || mime.contains("vnd.google-apps.document")
            || mime == "application/msword"
            || (mime.contains("document") && !mime.contains("spreadsheet"))
            || ext(&["doc", "docx"])
        {
            Some(Self::Document)
        } else if mime.contains("vnd.google-apps") || mime.contains("drive") {
            Some(Self::Drive)
        } else if mime.contains("pdf") || ext(&["pdf"]) {
            Some(Self::Pdf)
        } else if mime.starts_with("image/") || ext(&["jpg", "jpeg", "png", "gif"]) {
            Some(Self::Image)
        } else if mime.starts_with("video/") || ext(&["mp4", "avi", "mov"]) {
            Some(Self::Video)
        } else if mime.starts_with("audio/") || ext(&["mp3", "wav", "m4a"]) {
            Some(Self::Audio)
        } else {
            None
        }
    }
}

impl std::fmt::Display for AttachmentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Superstars ──────────────────────────────────────────────────────────────

/// Star and superstar markers, each backed by one canonical label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StarKind {
    Star,
    YellowStar,
    OrangeStar,
    RedStar,
    PurpleStar,
    BlueStar,
    GreenStar,
    RedBang,
    YellowBang,
    OrangeGuillemet,
    GreenCheck,
    BlueInfo,
    PurpleQuestion,
}

const STAR_TABLE: &[(StarKind, &str, &str)] = &[
    (StarKind::Star, "star", "STARRED"),
    (StarKind::YellowStar, "yellow-star", "YELLOW_STAR"),
    (StarKind::OrangeStar, "orange-star", "ORANGE_STAR"),
    (StarKind::RedStar, "red-star", "RED_STAR"),
    (StarKind::PurpleStar, "purple-star", "PURPLE_STAR"),
    (StarKind::BlueStar, "blue-star", "BLUE_STAR"),
    (StarKind::GreenStar, "green-star", "GREEN_STAR"),
    (StarKind::RedBang, "red-bang", "RED_BANG"),
    (StarKind::YellowBang, "yellow-bang", "YELLOW_BANG"),
    (StarKind::OrangeGuillemet, "orange-guillemet", "ORANGE_GUILLEMET"),
    (StarKind::GreenCheck, "green-check", "GREEN_CHECK"),
    (StarKind::BlueInfo, "blue-info", "BLUE_INFO"),
    (StarKind::PurpleQuestion, "purple-question", "PURPLE_QUESTION"),
];

impl StarKind {
    /// `has:` spelling, e.g. `yellow-star`. Underscores are accepted too.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.to_ascii_lowercase().replace('_', "-");
        STAR_TABLE
            .iter()
            .find(|(_, n, _)| *n == normalized)
            .map(|(kind, _, _)| *kind)
    }

    /// Label carried by records marked with this kind
    #[must_use]
    pub fn label(self) -> &'static str {
        STAR_TABLE
            .iter()
            .find(|(kind, _, _)| *kind == self)
            .map_or("STARRED", |(_, _, label)| label)
    }
}

// ── Inbox categories ────────────────────────────────────────────────────────

const CATEGORY_TABLE: &[(&str, &str)] = &[
    ("primary", "CATEGORY_PRIMARY"),
    ("personal", "CATEGORY_PERSONAL"),
    ("social", "CATEGORY_SOCIAL"),
    ("promotions", "CATEGORY_PROMOTIONS"),
    ("updates", "CATEGORY_UPDATES"),
    ("forums", "CATEGORY_FORUMS"),
    ("reservations", "CATEGORY_RESERVATIONS"),
    ("purchases", "CATEGORY_PURCHASES"),
    ("shopping", "CATEGORY_PURCHASES"),
];

/// Canonical label for a `category:` short name
#[must_use]
pub fn category_label(name: &str) -> Option<&'static str> {
    CATEGORY_TABLE
        .iter()
        .find(|(short, _)| short.eq_ignore_ascii_case(name))
        .map(|(_, label)| *label)
}

// ── has: / is: / in: vocabularies ───────────────────────────────────────────

/// Resolved value of a `has:` predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HasValue {
    Attachment,
    UserLabels,
    NoUserLabels,
    Category(AttachmentCategory),
    Star(StarKind),
}

impl HasValue {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "attachment" | "attachments" => Some(Self::Attachment),
            "userlabels" => Some(Self::UserLabels),
            "nouserlabels" => Some(Self::NoUserLabels),
            other => AttachmentCategory::from_name(other)
                .map(Self::Category)
                .or_else(|| StarKind::from_name(other).map(Self::Star)),
        }
    }
}

/// Resolved value of an `is:` predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsValue {
    Unread,
    Read,
    Starred,
    Important,
    /// Recognised, never stored
    Muted,
    /// Recognised, never stored
    Snoozed,
}

impl IsValue {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "unread" => Some(Self::Unread),
            "read" => Some(Self::Read),
            "starred" => Some(Self::Starred),
            "important" => Some(Self::Important),
            "muted" => Some(Self::Muted),
            "snoozed" => Some(Self::Snoozed),
            _ => None,
        }
    }
}

/// Resolved value of an `in:` predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Every record, spam and trash included
    Anywhere,
    /// Recognised, never stored
    Snoozed,
    /// Membership of a system label
    Label(&'static str),
}

impl Location {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let location = match value.to_ascii_lowercase().as_str() {
            "anywhere" => Self::Anywhere,
            "snoozed" => Self::Snoozed,
            "inbox" => Self::Label("INBOX"),
            "sent" => Self::Label("SENT"),
            "draft" | "drafts" => Self::Label("DRAFT"),
            "trash" => Self::Label("TRASH"),
            "spam" => Self::Label("SPAM"),
            "starred" => Self::Label("STARRED"),
            "important" => Self::Label("IMPORTANT"),
            _ => return None,
        };
        Some(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn youtube_container_is_not_video() {
        assert_eq!(
            AttachmentCategory::classify("video/x-youtube", ""),
            Some(AttachmentCategory::Youtube)
        );
        assert_eq!(
            AttachmentCategory::classify("video/mp4", "clip.mp4"),
            Some(AttachmentCategory::Video)
        );
    }

    #[test]
    fn mime_table() {
        let cases = [
            ("application/pdf", "", AttachmentCategory::Pdf),
            ("image/png", "", AttachmentCategory::Image),
            ("audio/mpeg", "", AttachmentCategory::Audio),
            (
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                "",
                AttachmentCategory::Spreadsheet,
            ),
            (
                "application/vnd.openxmlformats-officedocument.presentationml.presentation",
                "",
                AttachmentCategory::Presentation,
            ),
            (
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "",
                AttachmentCategory::Document,
            ),
            ("application/vnd.google-apps.document", "", AttachmentCategory::Document),
            ("application/vnd.google-apps.folder", "", AttachmentCategory::Drive),
        ];
        for (mime, name, expected) in cases {
            assert_eq!(
                AttachmentCategory::classify(mime, name),
                Some(expected),
                "{mime}"
            );
        }
    }

    #[test]
    fn extension_fallback() {
        let cases = [
            ("budget.XLSX", AttachmentCategory::Spreadsheet),
            ("deck.ppt", AttachmentCategory::Presentation),
            ("notes.docx", AttachmentCategory::Document),
            ("scan.pdf", AttachmentCategory::Pdf),
            ("photo.jpeg", AttachmentCategory::Image),
            ("movie.mov", AttachmentCategory::Video),
            ("memo.m4a", AttachmentCategory::Audio),
        ];
        for (name, expected) in cases {
            assert_eq!(
                AttachmentCategory::classify("application/octet-stream", name),
                Some(expected),
                "{name}"
            );
        }
        assert_eq!(AttachmentCategory::classify("text/plain", "readme"), None);
    }

    #[test]
    fn category_names_round_trip() {
        for category in AttachmentCategory::ALL {
            assert_eq!(AttachmentCategory::from_name(category.as_str()), Some(category));
        }
        assert_eq!(
            AttachmentCategory::from_name("PDF"),
            Some(AttachmentCategory::Pdf)
        );
        assert_eq!(AttachmentCategory::from_name("zip"), None);
    }

    #[test]
    fn star_kinds() {
        assert_eq!(StarKind::from_name("yellow-star"), Some(StarKind::YellowStar));
        assert_eq!(StarKind::from_name("RED_BANG"), Some(StarKind::RedBang));
        assert_eq!(StarKind::PurpleQuestion.label(), "PURPLE_QUESTION");
        assert_eq!(StarKind::Star.label(), "STARRED");
        assert_eq!(StarKind::from_name("pink-star"), None);
    }

    #[test]
    fn starred_set_covers_colours() {
        for kind in [
            StarKind::Star,
            StarKind::YellowStar,
            StarKind::OrangeStar,
            StarKind::RedStar,
            StarKind::PurpleStar,
            StarKind::BlueStar,
            StarKind::GreenStar,
        ] {
            assert!(STARRED_LABELS.contains(&kind.label()));
        }
        assert!(!STARRED_LABELS.contains(&StarKind::RedBang.label()));
    }

    #[test]
    fn category_aliases() {
        assert_eq!(category_label("purchases"), Some("CATEGORY_PURCHASES"));
        assert_eq!(category_label("Shopping"), Some("CATEGORY_PURCHASES"));
        assert_eq!(category_label("social"), Some("CATEGORY_SOCIAL"));
        assert_eq!(category_label("newsletters"), None);
    }

    #[test]
    fn has_values() {
        assert_eq!(HasValue::parse("attachment"), Some(HasValue::Attachment));
        assert_eq!(
            HasValue::parse("youtube"),
            Some(HasValue::Category(AttachmentCategory::Youtube))
        );
        assert_eq!(
            HasValue::parse("green-check"),
            Some(HasValue::Star(StarKind::GreenCheck))
        );
        assert_eq!(HasValue::parse("NoUserLabels"), Some(HasValue::NoUserLabels));
        assert_eq!(HasValue::parse("wings"), None);
    }

    #[test]
    fn is_and_in_values() {
        assert_eq!(IsValue::parse("UNREAD"), Some(IsValue::Unread));
        assert_eq!(IsValue::parse("muted"), Some(IsValue::Muted));
        assert_eq!(IsValue::parse("happy"), None);
        assert_eq!(Location::parse("anywhere"), Some(Location::Anywhere));
        assert_eq!(Location::parse("Drafts"), Some(Location::Label("DRAFT")));
        assert_eq!(Location::parse("chats"), None);
    }

    #[test]
    fn system_labels() {
        assert!(is_system_label("inbox"));
        assert!(is_system_label("STARRED"));
        assert!(!is_system_label("Label_42"));
        assert!(!is_system_label("YELLOW_STAR"));
    }
}
