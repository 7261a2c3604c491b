//! Swagger tool source runtime.
//!
//! [`SwaggerToolSource`] loads a spec, synthesizes an immutable [`ToolSet`], and serves
//! `list_tools` / `call_tool` at the MCP boundary. [`Invoker`] performs one call: build,
//! sign, send, classify.

use crate::config::ToolsConfig;
use crate::context::AmbientContext;
use crate::error::{Result, SwaggerToolsError};
use crate::loader::{SpecLoader, SpecSource};
use crate::request::{HeaderSigner, RequestSigner, build_request};
use crate::synthesis::{OperationBinding, SynthesizedTool, ToolDefinition, ToolSynthesizer};
use crate::transport::{HttpTransport, RawResponse, ReqwestTransport, redact_url};
use parking_lot::RwLock;
use rmcp::model::{CallToolResult, Content, Tool};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Successful (status < 400) backend answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutput {
    pub status: u16,
    pub body: String,
}

/// Map a raw response onto success or [`SwaggerToolsError::Backend`].
///
/// # Errors
///
/// Returns [`SwaggerToolsError::Backend`] for any status >= 400, carrying the body verbatim.
pub fn classify(response: RawResponse) -> Result<InvocationOutput> {
    if response.status >= 400 {
        return Err(SwaggerToolsError::Backend {
            status: response.status,
            body: response.body,
        });
    }
    Ok(InvocationOutput {
        status: response.status,
        body: response.body,
    })
}

#[derive(Clone)]
pub struct Invoker {
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn RequestSigner>,
}

impl Invoker {
    pub fn new(transport: Arc<dyn HttpTransport>, signer: Arc<dyn RequestSigner>) -> Self {
        Self { transport, signer }
    }

    /// Execute one operation. Exactly one request is attempted.
    ///
    /// # Errors
    ///
    /// Context, request, transport (including cancellation) and backend errors; all are scoped
    /// to this call.
    pub async fn invoke(
        &self,
        binding: &OperationBinding,
        arguments: &Map<String, Value>,
        ctx: &AmbientContext,
        default_base_url: Option<&str>,
    ) -> Result<InvocationOutput> {
        let mut request = build_request(binding, arguments, ctx, default_base_url)?;
        self.signer.sign(&mut request, ctx)?;

        let target = redact_url(&request.url);
        tracing::debug!(method = %binding.method, url = %target, "Invoking backend");
        let started = Instant::now();

        // Dropping the send future aborts the in-flight request.
        let response = tokio::select! {
            biased;
            () = ctx.cancellation().cancelled() => {
                Err(SwaggerToolsError::Transport(format!("request to {target} cancelled")))
            }
            res = self.transport.send(request) => res,
        }?;

        tracing::debug!(
            method = %binding.method,
            url = %target,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis(),
            "Backend responded"
        );
        classify(response)
    }
}

/// Immutable result of one load: tools by name plus the default base URL.
#[derive(Debug, Default)]
pub struct ToolSet {
    tools: Vec<SynthesizedTool>,
    index: HashMap<String, usize>,
    base_url: Option<String>,
    title: Option<String>,
}

impl ToolSet {
    #[must_use]
    pub fn new(tools: Vec<SynthesizedTool>, base_url: Option<String>) -> Self {
        let index = tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.definition.name.clone(), i))
            .collect();
        Self {
            tools,
            index,
            base_url,
            title: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SynthesizedTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter().map(|t| &t.definition)
    }

    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn to_mcp_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(SynthesizedTool::to_mcp_tool).collect()
    }
}

/// Swagger-backed tool source.
///
/// Cheap to clone; clones share the current tool set.
#[derive(Clone)]
pub struct SwaggerToolSource {
    inner: Arc<SourceInner>,
}

struct SourceInner {
    config: ToolsConfig,
    source: SpecSource,
    loader: SpecLoader,
    synthesizer: ToolSynthesizer,
    invoker: Invoker,
    tools: RwLock<Arc<ToolSet>>,
}

/// Builder for [`SwaggerToolSource`], for swapping the transport or spec source.
pub struct SwaggerToolSourceBuilder {
    config: ToolsConfig,
    source: Option<SpecSource>,
    transport: Option<Arc<dyn HttpTransport>>,
    signer: Option<Arc<dyn RequestSigner>>,
    client: Option<reqwest::Client>,
}

impl SwaggerToolSourceBuilder {
    #[must_use]
    pub fn spec_source(mut self, source: SpecSource) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    #[must_use]
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// # Errors
    ///
    /// Returns [`SwaggerToolsError::Config`] if the configuration is invalid.
    pub fn build(self) -> Result<SwaggerToolSource> {
        let config = self.config;
        config.validate()?;

        let client = self.client.unwrap_or_default();
        let source = match self.source {
            Some(source) => source,
            None => SpecSource::parse(&config.spec)?,
        };
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::from_config(&config, client.clone())));
        let signer = match self.signer {
            Some(signer) => signer,
            None => Arc::new(HeaderSigner::new(&config.credential_header)?),
        };

        Ok(SwaggerToolSource {
            inner: Arc::new(SourceInner {
                loader: SpecLoader::from_config(&config, client),
                synthesizer: ToolSynthesizer::from_config(&config),
                invoker: Invoker::new(transport, signer),
                source,
                config,
                tools: RwLock::new(Arc::new(ToolSet::default())),
            }),
        })
    }
}

impl SwaggerToolSource {
    #[must_use]
    pub fn builder(config: ToolsConfig) -> SwaggerToolSourceBuilder {
        SwaggerToolSourceBuilder {
            config,
            source: None,
            transport: None,
            signer: None,
            client: None,
        }
    }

    /// Source with the default reqwest transport and header signer.
    ///
    /// This does not load the spec; call [`Self::start`] before listing or calling tools.
    ///
    /// # Errors
    ///
    /// Returns [`SwaggerToolsError::Config`] if the configuration is invalid.
    pub fn new(config: ToolsConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Load the spec and publish the initial tool set.
    ///
    /// # Errors
    ///
    /// Any fetch, parse, expansion or naming error; no tools are published on failure.
    pub async fn start(&self) -> Result<()> {
        let count = self.reload().await?;
        tracing::info!(
            "Discovered {} tools from Swagger spec '{}'",
            count,
            self.inner.source.display()
        );
        Ok(())
    }

    /// Build a complete new tool set and swap it in atomically.
    ///
    /// Calls already in flight keep the snapshot they started with. On error the previous set
    /// stays published.
    ///
    /// # Errors
    ///
    /// Any fetch, parse, expansion or naming error.
    pub async fn reload(&self) -> Result<usize> {
        let spec = self.inner.loader.load(&self.inner.source).await?;
        let tools = self.inner.synthesizer.synthesize(&spec)?;
        let base_url = self
            .inner
            .config
            .base_url
            .clone()
            .or_else(|| spec.default_base_url());
        if base_url.is_none() {
            tracing::warn!(
                "No baseUrl configured and the spec names no host; every call must supply one"
            );
        }

        let set = ToolSet::new(tools, base_url).with_title(spec.info.title.clone());
        let count = set.len();
        *self.inner.tools.write() = Arc::new(set);
        tracing::info!(tools = count, "Published tool set");
        Ok(count)
    }

    /// Current tool set snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ToolSet> {
        self.inner.tools.read().clone()
    }

    #[must_use]
    pub fn config(&self) -> &ToolsConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.snapshot().to_mcp_tools()
    }

    /// Invoke a tool and return the typed outcome.
    ///
    /// # Errors
    ///
    /// [`SwaggerToolsError::UnknownTool`] for an unknown name; otherwise any per-call error.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Value,
        ctx: &AmbientContext,
    ) -> Result<InvocationOutput> {
        // Hold the snapshot, not the lock, across the await.
        let tools = self.snapshot();
        let tool = tools
            .get(name)
            .ok_or_else(|| SwaggerToolsError::UnknownTool(name.to_string()))?;

        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(SwaggerToolsError::Request(format!(
                    "arguments must be a JSON object, got {other}"
                )));
            }
        };

        self.inner
            .invoker
            .invoke(&tool.binding, &arguments, ctx, tools.base_url())
            .await
    }

    /// Execute a tool call at the MCP boundary.
    ///
    /// Per-call failures become error results (`isError: true`) whose text is the error message,
    /// e.g. `API error 404: {"error":"not found"}`.
    ///
    /// # Errors
    ///
    /// Returns [`SwaggerToolsError::UnknownTool`] if no tool has this name.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        ctx: &AmbientContext,
    ) -> Result<CallToolResult> {
        match self.invoke(name, arguments, ctx).await {
            Ok(output) => Ok(CallToolResult::success(vec![Content::text(output.body)])),
            Err(e @ SwaggerToolsError::UnknownTool(_)) => Err(e),
            Err(e) => {
                tracing::warn!(tool = name, kind = e.kind(), "Tool call failed: {e}");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }
}
