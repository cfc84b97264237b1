//! Solidity compiler adapter.
//!
//! Sources are compiled either by a local `solc` binary (`local = true`, the input being
//! a comma-separated list of paths) or by a node exposing `contract_compileContract`
//! (`local = false`, the input being the source text itself). Both paths produce the
//! same [`CompileResult`].

use std::{future::Future, path::PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;

use crate::{Error, Result, rpc::RpcClient};

/// Bytecode of a unit with nothing to deploy (interfaces, abstract contracts).
pub const ABSTRACT_BYTECODE: &str = "0x";

/// RPC method used for remote compilation.
pub const REMOTE_COMPILE_METHOD: &str = "contract_compileContract";

/// One compiled contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileUnit {
    /// Unit identifier; for local builds this is `<source path>:<contract name>`.
    pub name: String,
    /// JSON ABI array, serialized.
    pub abi: String,
    /// `0x`-prefixed creation bytecode.
    pub bytecode: String,
}

impl CompileUnit {
    /// Whether the unit has no deployable code.
    pub fn is_abstract(&self) -> bool {
        self.bytecode.trim() == ABSTRACT_BYTECODE
    }
}

/// Index-aligned compiler output: `abis[i]`, `bins[i]` and `names[i]` describe the same unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResult {
    #[serde(rename = "Abi", alias = "abi", alias = "abis", default)]
    pub abis: Vec<String>,
    #[serde(rename = "Bin", alias = "bin", alias = "bins", default)]
    pub bins: Vec<String>,
    #[serde(rename = "Types", alias = "types", alias = "names", default)]
    pub names: Vec<String>,
}

impl CompileResult {
    pub fn push(&mut self, unit: CompileUnit) {
        self.abis.push(unit.abi);
        self.bins.push(unit.bytecode);
        self.names.push(unit.name);
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// True when any of the three sequences is empty.
    pub fn is_empty(&self) -> bool {
        self.abis.is_empty() || self.bins.is_empty() || self.names.is_empty()
    }

    /// Check that the three sequences line up.
    pub fn validate(&self) -> Result<()> {
        if self.abis.len() != self.bins.len() || self.bins.len() != self.names.len() {
            return Err(Error::Compile(format!(
                "misaligned compile result: {} ABIs, {} bytecodes, {} names",
                self.abis.len(),
                self.bins.len(),
                self.names.len()
            )));
        }
        Ok(())
    }

    /// Iterate over the units in index order.
    pub fn units(&self) -> impl Iterator<Item = CompileUnit> + '_ {
        self.abis
            .iter()
            .zip(&self.bins)
            .zip(&self.names)
            .map(|((abi, bin), name)| CompileUnit {
                name: name.clone(),
                abi: abi.clone(),
                bytecode: bin.clone(),
            })
    }
}

impl FromIterator<CompileUnit> for CompileResult {
    fn from_iter<I: IntoIterator<Item = CompileUnit>>(iter: I) -> Self {
        let mut result = Self::default();
        for unit in iter {
            result.push(unit);
        }
        result
    }
}

/// Anything able to turn sources into a [`CompileResult`].
pub trait ContractCompiler: Send + Sync {
    fn compile(&self, source: &str, local: bool) -> impl Future<Output = Result<CompileResult>> + Send;
}

/// [`ContractCompiler`] backed by `solc` locally and `contract_compileContract` remotely.
#[derive(Debug, Clone)]
pub struct SolidityCompiler {
    solc: PathBuf,
    rpc: RpcClient,
}

impl SolidityCompiler {
    pub fn new(solc: impl Into<PathBuf>, rpc: RpcClient) -> Self {
        Self {
            solc: solc.into(),
            rpc,
        }
    }

    async fn compile_remote(&self, code: &str) -> Result<CompileResult> {
        self.rpc
            .request(REMOTE_COMPILE_METHOD, vec![Value::String(code.to_string())])
            .await
    }

    async fn compile_local(&self, paths: &str) -> Result<CompileResult> {
        let paths = split_source_paths(paths);
        if paths.is_empty() {
            return Err(Error::Compile("no source files given".to_string()));
        }

        tracing::debug!(solc = %self.solc.display(), ?paths, "Running solc");

        let output = Command::new(&self.solc)
            .arg("--combined-json")
            .arg("abi,bin")
            .args(&paths)
            .output()
            .await
            .map_err(|e| Error::Compile(format!("failed to run {}: {e}", self.solc.display())))?;

        if !output.status.success() {
            return Err(Error::Compile(format!(
                "solc exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_combined_json(&output.stdout)
    }
}

impl ContractCompiler for SolidityCompiler {
    async fn compile(&self, source: &str, local: bool) -> Result<CompileResult> {
        let result = if local {
            self.compile_local(source).await?
        } else {
            self.compile_remote(source).await?
        };
        tracing::info!(units = result.len(), local, "Compilation finished");
        Ok(result)
    }
}

fn split_source_paths(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Deserialize)]
struct CombinedJson {
    contracts: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct CombinedContract {
    abi: Value,
    #[serde(default)]
    bin: String,
}

/// Parse `solc --combined-json abi,bin` output, keeping the emitted unit order.
fn parse_combined_json(stdout: &[u8]) -> Result<CompileResult> {
    let combined: CombinedJson = serde_json::from_slice(stdout)
        .map_err(|e| Error::Compile(format!("unreadable solc output: {e}")))?;

    combined
        .contracts
        .into_iter()
        .map(|(name, raw)| {
            let contract: CombinedContract = serde_json::from_value(raw)
                .map_err(|e| Error::Compile(format!("unreadable output for {name}: {e}")))?;
            // Older solc releases emit the ABI as a JSON-encoded string.
            let abi = match contract.abi {
                Value::String(encoded) => serde_json::from_str::<Value>(&encoded)
                    .map_err(|e| Error::Compile(format!("unreadable ABI for {name}: {e}")))?,
                other => other,
            };
            let abi = serde_json::to_string(&abi)
                .map_err(|e| Error::Compile(format!("failed to flatten ABI for {name}: {e}")))?;
            let bytecode = format!("0x{}", contract.bin.trim().trim_start_matches("0x"));
            Ok(CompileUnit {
                name,
                abi,
                bytecode,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::rpc::RpcLogger;

    #[test]
    fn test_parse_combined_json_keeps_order_and_flags_abstract() {
        let stdout = json!({
            "contracts": {
                "contracts/token.sol:Token": {
                    "abi": [{"type": "constructor", "inputs": [], "stateMutability": "nonpayable"}],
                    "bin": "6080604052"
                },
                "contracts/token.sol:IToken": {
                    "abi": [],
                    "bin": ""
                }
            },
            "version": "0.8.26"
        });
        let result = parse_combined_json(stdout.to_string().as_bytes()).unwrap();

        assert_eq!(
            result.names,
            vec!["contracts/token.sol:Token", "contracts/token.sol:IToken"]
        );
        assert_eq!(result.bins, vec!["0x6080604052", "0x"]);
        assert!(result.abis[0].starts_with("[{"));

        let units: Vec<_> = result.units().collect();
        assert!(!units[0].is_abstract());
        assert!(units[1].is_abstract());
    }

    #[test]
    fn test_parse_combined_json_accepts_string_abi() {
        let stdout = json!({
            "contracts": {
                "a.sol:A": { "abi": "[]", "bin": "00" }
            }
        });
        let result = parse_combined_json(stdout.to_string().as_bytes()).unwrap();
        assert_eq!(result.abis, vec!["[]"]);
        assert_eq!(result.bins, vec!["0x00"]);
    }

    #[test]
    fn test_parse_combined_json_rejects_garbage() {
        let err = parse_combined_json(b"Error: ParserError").unwrap_err();
        assert!(matches!(err, Error::Compile(_)));
    }

    #[test]
    fn test_split_source_paths() {
        assert_eq!(split_source_paths("a.sol, b.sol,,"), vec!["a.sol", "b.sol"]);
        assert!(split_source_paths(" ").is_empty());
    }

    #[test]
    fn test_validate_detects_misalignment() {
        let result = CompileResult {
            abis: vec!["[]".into()],
            bins: vec!["0x".into(), "0x00".into()],
            names: vec!["A".into()],
        };
        assert!(matches!(result.validate(), Err(Error::Compile(_))));
        assert!(!result.is_empty());
        assert!(CompileResult::default().is_empty());
    }

    #[tokio::test]
    async fn test_missing_solc_is_compile_error() {
        let rpc = RpcClient::new("http://127.0.0.1:1".parse().unwrap(), RpcLogger::default())
            .unwrap();
        let compiler = SolidityCompiler::new("/nonexistent/solc-binary", rpc);
        let err = compiler.compile("a.sol", true).await.unwrap_err();
        assert!(matches!(err, Error::Compile(_)));
    }

    #[tokio::test]
    async fn test_remote_compile_uses_rpc_method() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "contract_compileContract",
                "params": ["contract A {}"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "jsonrpc": "2.0",
                "result": {"Abi": ["[]"], "Bin": ["0x00"], "Types": ["A"]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let rpc = RpcClient::new(server.uri().parse().unwrap(), RpcLogger::default()).unwrap();
        let result = SolidityCompiler::new("solc", rpc)
            .compile("contract A {}", false)
            .await
            .unwrap();
        assert_eq!(result.names, vec!["A"]);
        assert_eq!(result.bins, vec!["0x00"]);
    }
}
