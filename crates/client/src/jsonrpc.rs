//! Raw JSON-RPC plumbing shared by the BCH and side-chain clients:
//! request body templates, the response envelope, and the POST
//! transport with HTTP basic auth.

use serde::{de::DeserializeOwned, Deserialize};

use crate::error::{ClientError, ClientResult};

/// Content type the BCH full node expects on raw JSON-RPC posts.
pub const CONTENT_TYPE_BCH: &str = "text/plain;";

/// Content type for the side-chain JSON-RPC endpoint.
pub const CONTENT_TYPE_SBCH: &str = "application/json";

pub(crate) const REQ_BLOCK_COUNT: &str =
    r#"{"jsonrpc": "1.0", "id":"bchwatch", "method": "getblockcount", "params": [] }"#;

pub(crate) fn req_block_hash(height: i64) -> String {
    format!(
        r#"{{"jsonrpc": "1.0", "id":"bchwatch", "method": "getblockhash", "params": [{height}] }}"#
    )
}

// verbosity 2 so every transaction is inlined
pub(crate) fn req_block(hash: &str) -> String {
    format!(
        r#"{{"jsonrpc": "1.0", "id":"bchwatch", "method": "getblock", "params": ["{hash}",2] }}"#
    )
}

pub(crate) fn req_raw_tx(txid: &str, blockhash: &str) -> String {
    format!(
        r#"{{"jsonrpc": "1.0", "id":"bchwatch", "method": "getrawtransaction", "params": ["{txid}", true, "{blockhash}"] }}"#
    )
}

pub(crate) fn req_vote_infos(start: u64, end: u64) -> String {
    format!(
        r#"{{"jsonrpc": "2.0", "method": "sbch_getVoteInfoByEpochNumber", "params": ["0x{start:x}","0x{end:x}"], "id":1}}"#
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorObject {
    pub(crate) code: i64,
    #[serde(default)]
    pub(crate) message: String,
}

/// JSON-RPC response envelope. Both endpoints use the same shape.
#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse<T> {
    pub(crate) result: Option<T>,
    pub(crate) error: Option<RpcErrorObject>,
}

impl<T> RpcResponse<T> {
    pub(crate) fn into_result(self) -> ClientResult<T> {
        if let Some(err) = self.error {
            if err.code < 0 {
                return Err(ClientError::Rpc {
                    code: err.code,
                    message: err.message,
                });
            }
        }
        self.result.ok_or(ClientError::MissingResult)
    }
}

/// POST transport carrying pre-formatted JSON-RPC bodies.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    username: String,
    password: String,
    content_type: &'static str,
}

impl HttpTransport {
    pub fn new(url: &str, username: &str, password: &str, content_type: &'static str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
            content_type,
        }
    }

    /// Posts a request body and unwraps the response envelope.
    pub(crate) async fn call<T: DeserializeOwned>(&self, body: String) -> ClientResult<T> {
        let resp = self
            .http
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::CONTENT_TYPE, self.content_type)
            .body(body)
            .send()
            .await?;
        let bytes = resp.bytes().await?;
        let envelope: RpcResponse<T> = serde_json::from_slice(&bytes)?;
        envelope.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_bodies_are_wire_exact() {
        assert_eq!(
            REQ_BLOCK_COUNT,
            r#"{"jsonrpc": "1.0", "id":"bchwatch", "method": "getblockcount", "params": [] }"#
        );
        assert_eq!(
            req_block_hash(1508978),
            r#"{"jsonrpc": "1.0", "id":"bchwatch", "method": "getblockhash", "params": [1508978] }"#
        );
        assert_eq!(
            req_block("00aa"),
            r#"{"jsonrpc": "1.0", "id":"bchwatch", "method": "getblock", "params": ["00aa",2] }"#
        );
        assert_eq!(
            req_raw_tx("dead", "beef"),
            r#"{"jsonrpc": "1.0", "id":"bchwatch", "method": "getrawtransaction", "params": ["dead", true, "beef"] }"#
        );
        assert_eq!(
            req_vote_infos(1, 101),
            r#"{"jsonrpc": "2.0", "method": "sbch_getVoteInfoByEpochNumber", "params": ["0x1","0x65"], "id":1}"#
        );
    }

    #[test]
    fn envelope_unwraps_result() {
        let env: RpcResponse<i64> = serde_json::from_str(r#"{"result": 42, "error": null}"#).unwrap();
        assert_eq!(env.into_result().unwrap(), 42);
    }

    #[test]
    fn envelope_surfaces_rpc_error() {
        let env: RpcResponse<i64> = serde_json::from_str(
            r#"{"result": null, "error": {"code": -32601, "message": "method not found"}}"#,
        )
        .unwrap();
        match env.into_result() {
            Err(ClientError::Rpc { code, message }) => {
                assert_eq!(code, -32601);
                assert_eq!(message, "method not found");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn envelope_without_result_is_an_error() {
        let env: RpcResponse<i64> = serde_json::from_str("{}").unwrap();
        assert!(matches!(env.into_result(), Err(ClientError::MissingResult)));
    }
}
