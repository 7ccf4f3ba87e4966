//! Client side of the restaurant map: viewport tracking, marker clustering,
//! the card list and the detail overlay. Nothing here touches the database;
//! it talks to the server through [`api_client::MapBackend`].

pub mod api_client;
pub mod card_list;
pub mod cluster;
pub mod layer;
pub mod markers;
pub mod projection;
pub mod selection;
pub mod session;
pub mod viewport;
pub mod watcher;

pub use api_client::{ApiClient, ClientError, MapBackend};
pub use session::{spawn_session, MapEvent, MapHandle, MapSnapshot, SessionOptions};
