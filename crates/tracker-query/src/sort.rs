use serde::Serialize;
use tracing::debug;

/// Columns a client may sort by. Anything else falls back to
/// [`SortField::ApplicationDate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    ApplicationDate,
    CompanyName,
    Position,
    Status,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::ApplicationDate,
        SortField::CompanyName,
        SortField::Position,
        SortField::Status,
        SortField::CreatedAt,
        SortField::UpdatedAt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::ApplicationDate => "applicationDate",
            SortField::CompanyName => "companyName",
            SortField::Position => "position",
            SortField::Status => "status",
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
        }
    }

    fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Direction {
    #[serde(rename = "asc")]
    Ascending,
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

impl Direction {
    /// `1` for ascending, `-1` for descending.
    pub fn signum(&self) -> i8 {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SortSpec {
    #[serde(rename = "by")]
    pub field: SortField,
    #[serde(rename = "order")]
    pub direction: Direction,
}

/// Normalize a client-supplied sort. Never fails: unknown fields become
/// `applicationDate`, and only a literal `asc` sorts ascending.
pub fn resolve_sort(by: Option<&str>, order: Option<&str>) -> SortSpec {
    let field = match by.map(str::trim).filter(|b| !b.is_empty()) {
        None => SortField::default(),
        Some(name) => SortField::from_wire(name).unwrap_or_else(|| {
            debug!("Unknown sort field '{}', falling back to applicationDate", name);
            SortField::default()
        }),
    };

    let direction = match order.map(str::trim) {
        Some("asc") => Direction::Ascending,
        _ => Direction::Descending,
    };

    SortSpec { field, direction }
}
