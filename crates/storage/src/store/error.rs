#![forbid(unsafe_code)]

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    UnknownProject,
    UnknownMilestone,
    UnknownSprint,
    UnknownTask,
    UnknownChecklistItem,
    UnknownGoal,
    UnknownEnrollment,
    UnknownReward,
    UnknownUserReward,
    DuplicateEnrollment,
    CapacityExceeded { max_users: u32 },
    GoalNotAvailable,
    Forbidden(&'static str),
    NotSponsored,
    OrphanedChecklistItem { item_id: String },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::UnknownProject => write!(f, "unknown project"),
            Self::UnknownMilestone => write!(f, "unknown milestone"),
            Self::UnknownSprint => write!(f, "unknown sprint"),
            Self::UnknownTask => write!(f, "unknown task"),
            Self::UnknownChecklistItem => write!(f, "unknown checklist item"),
            Self::UnknownGoal => write!(f, "unknown sponsored goal"),
            Self::UnknownEnrollment => write!(f, "unknown enrollment"),
            Self::UnknownReward => write!(f, "unknown reward"),
            Self::UnknownUserReward => write!(f, "unknown user reward"),
            Self::DuplicateEnrollment => write!(f, "user is already enrolled in this goal"),
            Self::CapacityExceeded { max_users } => {
                write!(f, "goal is at capacity (max_users={max_users})")
            }
            Self::GoalNotAvailable => write!(f, "goal is outside its availability window"),
            Self::Forbidden(message) => write!(f, "forbidden: {message}"),
            Self::NotSponsored => write!(f, "project is not sponsored"),
            Self::OrphanedChecklistItem { item_id } => {
                write!(f, "checklist item {item_id} has no owner")
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}
