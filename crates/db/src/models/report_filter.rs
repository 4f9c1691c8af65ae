use uuid::Uuid;

/// Narrows the rows a report query loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportFilter {
    Project(Uuid),
    /// Items owned by or assigned to any of these users.
    Participants(Vec<Uuid>),
}
