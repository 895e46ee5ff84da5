#![forbid(unsafe_code)]

pub mod derive;
pub mod duplicate;

pub mod ids {
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct UserId(String);

    impl UserId {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, UserIdError> {
            let value = value.into();
            validate_user_id(&value)?;
            Ok(Self(value))
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum UserIdError {
        Empty,
        TooLong,
        InvalidFirstChar,
        InvalidChar { ch: char, index: usize },
    }

    impl UserIdError {
        pub fn message(&self) -> &'static str {
            match self {
                Self::Empty => "user id must not be empty",
                Self::TooLong => "user id is too long",
                Self::InvalidFirstChar => "user id must start with an ascii letter or digit",
                Self::InvalidChar { .. } => "user id contains an unsupported character",
            }
        }
    }

    fn validate_user_id(value: &str) -> Result<(), UserIdError> {
        if value.is_empty() {
            return Err(UserIdError::Empty);
        }
        if value.len() > 128 {
            return Err(UserIdError::TooLong);
        }
        let mut chars = value.chars();
        let Some(first) = chars.next() else {
            return Err(UserIdError::Empty);
        };
        if !first.is_ascii_alphanumeric() {
            return Err(UserIdError::InvalidFirstChar);
        }
        for (index, ch) in value.chars().enumerate() {
            if index == 0 {
                continue;
            }
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '@' | '-') {
                continue;
            }
            return Err(UserIdError::InvalidChar { ch, index });
        }
        Ok(())
    }
}

pub mod model {
    /// Derived status of a Task, Milestone, or Project. Created at
    /// `Pending` and mutated only by the deriver operations, never by
    /// direct user input.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Status {
        Pending,
        InProgress,
        Completed,
    }

    impl Status {
        pub fn as_str(self) -> &'static str {
            match self {
                Status::Pending => "pending",
                Status::InProgress => "in_progress",
                Status::Completed => "completed",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "pending" => Some(Status::Pending),
                "in_progress" => Some(Status::InProgress),
                "completed" => Some(Status::Completed),
                _ => None,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum EnrollmentStatus {
        Active,
        Inactive,
        Completed,
    }

    impl EnrollmentStatus {
        pub fn as_str(self) -> &'static str {
            match self {
                EnrollmentStatus::Active => "active",
                EnrollmentStatus::Inactive => "inactive",
                EnrollmentStatus::Completed => "completed",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "active" => Some(EnrollmentStatus::Active),
                "inactive" => Some(EnrollmentStatus::Inactive),
                "completed" => Some(EnrollmentStatus::Completed),
                _ => None,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum RewardStatus {
        Pending,
        Claimed,
        Delivered,
    }

    impl RewardStatus {
        pub fn as_str(self) -> &'static str {
            match self {
                RewardStatus::Pending => "pending",
                RewardStatus::Claimed => "claimed",
                RewardStatus::Delivered => "delivered",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "pending" => Some(RewardStatus::Pending),
                "claimed" => Some(RewardStatus::Claimed),
                "delivered" => Some(RewardStatus::Delivered),
                _ => None,
            }
        }
    }

    /// How a sponsor confirms that an enrollee finished a milestone.
    /// Only `manual` goals accept the sponsor verification override.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Verification {
        Checklist,
        Manual,
        Qr,
        ExternalApi,
    }

    impl Verification {
        pub fn as_str(self) -> &'static str {
            match self {
                Verification::Checklist => "checklist",
                Verification::Manual => "manual",
                Verification::Qr => "qr",
                Verification::ExternalApi => "external_api",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "checklist" => Some(Verification::Checklist),
                "manual" => Some(Verification::Manual),
                "qr" => Some(Verification::Qr),
                "external_api" => Some(Verification::ExternalApi),
                _ => None,
            }
        }
    }

    /// A checklist item belongs to exactly one owner: a Task in a user
    /// hierarchy, or a sponsored-goal template. The variant carries the
    /// owning id, so "neither" and "both" are unrepresentable.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum ChecklistOwner {
        Task(String),
        Template(String),
    }

    impl ChecklistOwner {
        pub fn task_id(&self) -> Option<&str> {
            match self {
                ChecklistOwner::Task(id) => Some(id),
                ChecklistOwner::Template(_) => None,
            }
        }

        pub fn goal_id(&self) -> Option<&str> {
            match self {
                ChecklistOwner::Task(_) => None,
                ChecklistOwner::Template(id) => Some(id),
            }
        }
    }
}
