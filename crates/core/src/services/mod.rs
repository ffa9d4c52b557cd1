//! Business logic services.

#![allow(missing_docs)]

pub mod account;
pub mod feed;
pub mod following;
pub mod poll;
pub mod search;
pub mod vote;

pub use account::{
    AccountOverview, AccountService, ChangeEmailInput, ChangePasswordInput, CreateUserInput,
};
pub use feed::{FeedService, UserPolls};
pub use following::{FollowingService, Relationship, UserProfile};
pub use poll::{CreatePollInput, OptionTally, PollDetail, PollService};
pub use search::{RankedPoll, SearchOverview, SearchService, relevance};
pub use vote::{PollView, VoteService};
