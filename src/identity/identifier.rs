use uuid::Uuid;

/// Dash offsets of the hyphenated uuid form (8-4-4-4-12)
const DASH_GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

/// A raw player identifier classified by shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// 36-char hyphenated uuid, lowercased
    DashedUuid(String),
    /// 32-char compact hex uuid, lowercased
    CompactUuid(String),
    /// Anything else is treated as a player name, kept as typed
    Name(String),
}

impl Identifier {
    /// Trims the input and classifies it. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let identifier = match trimmed.len() {
            36 if is_uuid_shaped(trimmed) => Identifier::DashedUuid(trimmed.to_ascii_lowercase()),
            32 if is_uuid_shaped(trimmed) => {
                Identifier::CompactUuid(trimmed.to_ascii_lowercase())
            }
            _ => Identifier::Name(trimmed.to_string()),
        };

        Some(identifier)
    }

    /// The value used for the first lookup
    pub fn as_str(&self) -> &str {
        match self {
            Identifier::DashedUuid(value)
            | Identifier::CompactUuid(value)
            | Identifier::Name(value) => value,
        }
    }

    /// The same uuid in the other dash convention, used for the single retry.
    /// Names have no alternate form.
    pub fn alternate_form(&self) -> Option<String> {
        match self {
            Identifier::DashedUuid(value) => Some(strip_dashes(value)),
            Identifier::CompactUuid(value) => Some(insert_dashes(value)),
            Identifier::Name(_) => None,
        }
    }
}

// Callers guard on length (32 or 36), which excludes the braced and urn forms
fn is_uuid_shaped(value: &str) -> bool {
    Uuid::try_parse(value).is_ok()
}

pub fn strip_dashes(value: &str) -> String {
    value.chars().filter(|c| *c != '-').collect()
}

pub fn insert_dashes(value: &str) -> String {
    let compact = strip_dashes(value);
    if compact.len() != 32 {
        return compact;
    }

    let mut dashed = String::with_capacity(36);
    let mut offset = 0;
    for (index, width) in DASH_GROUPS.iter().enumerate() {
        if index > 0 {
            dashed.push('-');
        }
        dashed.push_str(&compact[offset..offset + width]);
        offset += width;
    }
    dashed
}
