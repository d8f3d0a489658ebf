//! # pubsub
//!
//! Redis Pub/Sub subscriptions over a single connection.
//!
//! A [`Connection`] owns the socket and runs on its own task. Subscription
//! changes go through the cloneable [`PubSubClient`] and resolve once Redis
//! acknowledges them; events for each channel or pattern are delivered to
//! the [`EventReceiver`] it was registered with.
//!
//! ```no_run
//! use pubsub::PubSubEvent;
//! use pubsub::SubscriptionTarget;
//!
//! # async fn demo() -> Result<(), pubsub::PubSubError> {
//! let (connection, client) = pubsub::connect("127.0.0.1:6379").await?;
//! tokio::spawn(connection.run());
//!
//! let count = client
//! 	.add_subscription(SubscriptionTarget::channels(["news"]), |event: PubSubEvent| {
//! 		println!("{:?}", event);
//! 	})
//! 	.await?;
//! assert_eq!(count, 1);
//!
//! client.remove_subscription(SubscriptionTarget::all_channels()).await?;
//! client.close().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod connection;
mod error;
mod event;
mod frame;
mod handler;
mod metrics;
mod pending;
mod registry;
mod target;
mod transport;

pub use client::PubSubClient;
pub use connection::Connection;
pub use connection::DEFAULT_READ_BUFFER_SIZE;
pub use connection::connect;
pub use error::PubSubError;
pub use event::EventReceiver;
pub use event::PubSubEvent;
pub use event::UnsubscribeSource;
pub use handler::HandlerState;
pub use handler::PubSubHandler;
pub use metrics::MetricsSink;
pub use metrics::NoopMetrics;
pub use pending::SubscriptionFuture;
pub use target::SubscriptionKey;
pub use target::SubscriptionKind;
pub use target::SubscriptionTarget;
pub use transport::CommandSink;
