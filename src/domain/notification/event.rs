//! Team activity events published after successful writes

use super::entity::{Notification, NotificationCategory};
use crate::domain::team::TeamId;
use crate::domain::user::UserId;

/// Something that happened inside a team
#[derive(Debug, Clone, PartialEq)]
pub enum TeamEvent {
    TeamCreated {
        team_id: TeamId,
        team_name: String,
        actor_email: String,
    },
    MemberJoined {
        team_id: TeamId,
        user_id: UserId,
        actor_email: String,
    },
    TaskAdded {
        team_id: TeamId,
        task_title: String,
    },
    TaskCompleted {
        team_id: TeamId,
        task_title: String,
    },
}

impl TeamEvent {
    pub fn team_id(&self) -> &TeamId {
        match self {
            Self::TeamCreated { team_id, .. }
            | Self::MemberJoined { team_id, .. }
            | Self::TaskAdded { team_id, .. }
            | Self::TaskCompleted { team_id, .. } => team_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::TeamCreated { .. } => "team_created",
            Self::MemberJoined { .. } => "member_joined",
            Self::TaskAdded { .. } => "task_added",
            Self::TaskCompleted { .. } => "task_completed",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::TeamCreated { .. } => "Team Created",
            Self::MemberJoined { .. } => "Team Member Joined",
            Self::TaskAdded { .. } => "New Task",
            Self::TaskCompleted { .. } => "Task Completed",
        }
    }

    pub fn subtitle(&self) -> String {
        match self {
            Self::TeamCreated { actor_email, .. } => format!("{} created the team", actor_email),
            Self::MemberJoined { actor_email, .. } => format!("{} joined", actor_email),
            Self::TaskAdded { task_title, .. } => format!("{} added", task_title),
            Self::TaskCompleted { task_title, .. } => format!("{} completed", task_title),
        }
    }

    pub fn category(&self) -> NotificationCategory {
        match self {
            Self::TeamCreated { .. } => NotificationCategory::Info,
            Self::MemberJoined { .. } => NotificationCategory::Join,
            Self::TaskAdded { .. } | Self::TaskCompleted { .. } => NotificationCategory::Task,
        }
    }

    /// Build the notification this event is recorded as
    pub fn to_notification(&self) -> Notification {
        Notification::new(
            self.team_id().clone(),
            self.title(),
            self.subtitle(),
            self.category(),
        )
    }
}
