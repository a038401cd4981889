//! Identifier newtypes
//!
//! Chat platforms hand out 64-bit snowflake ids for guilds, channels and users.
//! Wrapping them keeps a guild id from being passed where a channel id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake_id!(
    /// Isolated chat community; the unit of session isolation
    GuildId
);
snowflake_id!(
    /// Text or voice channel within a guild
    ChannelId
);
snowflake_id!(
    /// Chat user
    UserId
);
