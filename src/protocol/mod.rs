pub mod request;
pub mod response;

pub use request::{JsonRpcNotification, JsonRpcRequest, RpcId, JSONRPC_VERSION};
pub use response::{JsonRpcError, JsonRpcResponse, ResponsePayload};
