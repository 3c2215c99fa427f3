//! Event-triggered first-comment automation.
//!
//! Flow: "new channel post" notification → [`ChannelEventProcessor`] reads
//! the channel settings and suppresses redeliveries → [`CommentDispatcher`]
//! attaches the comment through a [`CommentPoster`], retrying transient
//! transport failures with exponential backoff and reporting terminal
//! failures to the operators.

pub mod dispatcher;
pub mod poster;
pub mod processor;
pub mod recent;

#[cfg(test)]
mod testutil;

pub use {
    dispatcher::{AutomationAttempt, CommentDispatcher, Outcome, RetryPolicy},
    poster::{CommentPoster, FailureNotifier, PostError},
    processor::ChannelEventProcessor,
    recent::RecentPosts,
};
