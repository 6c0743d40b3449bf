#![doc = include_str!("../README.md")]

mod client;
mod error;

pub use client::{PeerClient, PeerReceiver, PeerSender};
pub use error::ClientError;
