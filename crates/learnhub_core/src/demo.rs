//! crates/learnhub_core/src/demo.rs
//!
//! Hard-coded demo accounts. A demo login assigns a role without contacting
//! any backend; usernames compare case-insensitively, passwords exactly.

use uuid::Uuid;

use crate::domain::{Preferences, Role, User};

pub const DEMO_PASSWORD: &str = "12345678";

struct DemoAccount {
    username: &'static str,
    email: &'static str,
    role: Role,
    /// Fixed so that records created in one demo login survive the next.
    id: u128,
}

const DEMO_ACCOUNTS: &[DemoAccount] = &[
    DemoAccount {
        username: "student",
        email: "student@learnhub.demo",
        role: Role::Student,
        id: 0x5eed_0000_0000_4000_8000_0000_0000_0001,
    },
    DemoAccount {
        username: "mentor",
        email: "mentor@learnhub.demo",
        role: Role::Mentor,
        id: 0x5eed_0000_0000_4000_8000_0000_0000_0002,
    },
    DemoAccount {
        username: "teacher",
        email: "teacher@learnhub.demo",
        role: Role::Teacher,
        id: 0x5eed_0000_0000_4000_8000_0000_0000_0003,
    },
    DemoAccount {
        username: "admin",
        email: "admin@learnhub.demo",
        role: Role::Admin,
        id: 0x5eed_0000_0000_4000_8000_0000_0000_0004,
    },
    DemoAccount {
        username: "HARSH",
        email: "harsh@learnhub.demo",
        role: Role::MentorAdmin,
        id: 0x5eed_0000_0000_4000_8000_0000_0000_0005,
    },
];

/// Outcome of checking an identifier against the demo accounts.
#[derive(Debug, Clone, PartialEq)]
pub enum DemoLogin {
    /// Not a demo username; other login paths may try it.
    NotDemo,
    /// A demo username with the wrong password.
    Rejected,
    Accepted(User),
}

pub fn demo_login(username: &str, password: &str) -> DemoLogin {
    let username = username.trim();
    match DEMO_ACCOUNTS
        .iter()
        .find(|a| a.username.eq_ignore_ascii_case(username))
    {
        None => DemoLogin::NotDemo,
        Some(_) if password != DEMO_PASSWORD => DemoLogin::Rejected,
        Some(account) => DemoLogin::Accepted(account.to_user()),
    }
}

/// Whether `username` is reserved by a demo account.
pub fn is_demo_username(username: &str) -> bool {
    DEMO_ACCOUNTS
        .iter()
        .any(|a| a.username.eq_ignore_ascii_case(username.trim()))
}

/// All demo users, e.g. to seed the leaderboard with real participants.
pub fn demo_users() -> Vec<User> {
    DEMO_ACCOUNTS.iter().map(DemoAccount::to_user).collect()
}

impl DemoAccount {
    fn to_user(&self) -> User {
        User {
            id: Uuid::from_u128(self.id),
            username: self.username.to_string(),
            email: self.email.to_string(),
            role: self.role,
            avatar: None,
            preferences: Preferences::default(),
            progress: Default::default(),
        }
    }
}
