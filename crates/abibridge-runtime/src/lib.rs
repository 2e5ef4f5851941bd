//! Runtime half of the bridge: marshals action calls into wire actions and
//! coerces table rows into the values the generated bindings promise.

pub mod account;
pub mod asset;
pub mod coerce;
pub mod dispatch;
pub mod error;
pub mod marshal;
pub mod query;
pub mod stats;
pub mod value;

pub use account::{account_name_from_public_key, Account, ActorPermission};
pub use asset::{Asset, AssetError, ExtendedAsset, ExtendedSymbol, Symbol};
pub use coerce::{coerce_rows, Row, RowLayout, TableRows};
pub use dispatch::{ChainTransport, ContractCapability, ContractHandle, DispatchTable, Method};
pub use error::{RuntimeError, RuntimeResult};
pub use marshal::{marshal, CallArgs, CallOptions, MarshalledAction, WireAction};
pub use query::{GetTableRowsRequest, TableQuery};
pub use stats::{ActionStats, ActionSummary};
pub use value::{HostValue, VariantValue};
