//! Main language server implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tower_lsp::async_trait;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    ConfigurationItem, DidChangeConfigurationParams, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DocumentFormattingParams,
    DocumentRangeFormattingParams, FormattingOptions, InitializeParams, InitializeResult,
    InitializedParams, OneOf, Range, ServerCapabilities, ServerInfo, TextDocumentItem,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextEdit, Url,
};
use tower_lsp::Client;
use tracing::{debug, info, warn};
use xml_format::{FormatError, FormatSettings};

use crate::features::formatting;
use crate::settings::{merge_settings, SettingsCache, SETTINGS_SECTION};

#[async_trait]
pub trait LspClient: Send + Sync + Clone + 'static {
    /// Pull the `xml.format` section scoped to `uri`. `None` when the client has nothing.
    async fn fetch_settings(&self, uri: &Url) -> Option<Value>;
}

#[async_trait]
impl LspClient for Client {
    async fn fetch_settings(&self, uri: &Url) -> Option<Value> {
        let items = vec![ConfigurationItem {
            scope_uri: Some(uri.clone()),
            section: Some(SETTINGS_SECTION.to_string()),
        }];
        match self.configuration(items).await {
            Ok(values) => values.into_iter().next(),
            Err(err) => {
                warn!(%uri, %err, "workspace/configuration request failed");
                None
            }
        }
    }
}

pub trait FeatureProvider: Send + Sync + 'static {
    fn format_document(
        &self,
        text: &str,
        options: &FormattingOptions,
        settings: &FormatSettings,
    ) -> Vec<TextEdit>;

    fn format_range(
        &self,
        text: &str,
        range: Range,
        options: &FormattingOptions,
        settings: &FormatSettings,
    ) -> std::result::Result<Vec<TextEdit>, FormatError>;
}

#[derive(Default)]
pub struct DefaultFeatureProvider;

impl DefaultFeatureProvider {
    pub fn new() -> Self {
        Self
    }
}

impl FeatureProvider for DefaultFeatureProvider {
    fn format_document(
        &self,
        text: &str,
        options: &FormattingOptions,
        settings: &FormatSettings,
    ) -> Vec<TextEdit> {
        formatting::format_document(text, options, settings)
    }

    fn format_range(
        &self,
        text: &str,
        range: Range,
        options: &FormattingOptions,
        settings: &FormatSettings,
    ) -> std::result::Result<Vec<TextEdit>, FormatError> {
        formatting::format_range(text, range, options, settings)
    }
}

#[derive(Default)]
struct DocumentStore {
    entries: RwLock<HashMap<Url, Arc<String>>>,
}

impl DocumentStore {
    async fn upsert(&self, uri: Url, text: String) {
        self.entries.write().await.insert(uri, Arc::new(text));
    }

    async fn get(&self, uri: &Url) -> Option<Arc<String>> {
        self.entries.read().await.get(uri).cloned()
    }

    async fn remove(&self, uri: &Url) {
        self.entries.write().await.remove(uri);
    }
}

pub struct XmlLanguageServer<C = Client, P = DefaultFeatureProvider> {
    client: C,
    documents: DocumentStore,
    settings: SettingsCache,
    base_settings: FormatSettings,
    pull_configuration: AtomicBool,
    features: Arc<P>,
}

impl XmlLanguageServer<Client, DefaultFeatureProvider> {
    pub fn new(client: Client) -> Self {
        Self::with_settings(client, FormatSettings::default())
    }

    /// Server whose settings fall back to `base_settings` instead of the built-in defaults.
    pub fn with_settings(client: Client, base_settings: FormatSettings) -> Self {
        Self::with_features(
            client,
            Arc::new(DefaultFeatureProvider::new()),
            base_settings,
        )
    }
}

impl<C, P> XmlLanguageServer<C, P>
where
    C: LspClient,
    P: FeatureProvider,
{
    pub fn with_features(client: C, features: Arc<P>, base_settings: FormatSettings) -> Self {
        Self {
            client,
            documents: DocumentStore::default(),
            settings: SettingsCache::default(),
            base_settings,
            pull_configuration: AtomicBool::new(false),
            features,
        }
    }

    /// Cached settings for `uri`, resolving them on first use.
    ///
    /// A resolution that races with `didClose` or `didChangeConfiguration` is still used for the
    /// request that triggered it, but is not cached.
    async fn settings_for(&self, uri: &Url) -> FormatSettings {
        if let Some(cached) = self.settings.get(uri).await {
            return cached;
        }
        let generation = self.settings.generation().await;
        let resolved = if self.pull_configuration.load(Ordering::Relaxed) {
            match self.client.fetch_settings(uri).await {
                Some(overlay) => merge_settings(&self.base_settings, overlay),
                None => self.base_settings.clone(),
            }
        } else {
            self.base_settings.clone()
        };
        let cached = self
            .settings
            .insert(uri.clone(), resolved.clone(), generation)
            .await;
        debug!(%uri, enabled = resolved.enabled, cached, "resolved format settings");
        resolved
    }
}

#[async_trait]
impl<C, P> tower_lsp::LanguageServer for XmlLanguageServer<C, P>
where
    C: LspClient,
    P: FeatureProvider,
{
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let pull = params
            .capabilities
            .workspace
            .and_then(|workspace| workspace.configuration)
            .unwrap_or(false);
        self.pull_configuration.store(pull, Ordering::Relaxed);
        info!(pull_configuration = pull, "initializing xml-lsp");

        let capabilities = ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            document_formatting_provider: Some(OneOf::Left(true)),
            document_range_formatting_provider: Some(OneOf::Left(true)),
            ..ServerCapabilities::default()
        };

        Ok(InitializeResult {
            capabilities,
            server_info: Some(ServerInfo {
                name: "xml-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("xml-lsp ready");
    }

    async fn shutdown(&self) -> Result<()> {
        info!("shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let TextDocumentItem { uri, text, .. } = params.text_document;
        debug!(%uri, "opened");
        self.documents.upsert(uri, text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        if let Some(change) = params.content_changes.into_iter().last() {
            self.documents
                .upsert(params.text_document.uri, change.text)
                .await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!(%uri, "closed");
        self.documents.remove(&uri).await;
        self.settings.invalidate(&uri).await;
    }

    async fn did_change_configuration(&self, _: DidChangeConfigurationParams) {
        debug!("configuration changed, dropping cached settings");
        self.settings.clear().await;
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;
        let Some(text) = self.documents.get(&uri).await else {
            debug!(%uri, "formatting requested for unknown document");
            return Ok(Some(Vec::new()));
        };
        let settings = self.settings_for(&uri).await;
        let edits = self
            .features
            .format_document(&text, &params.options, &settings);
        debug!(%uri, edits = edits.len(), "formatted document");
        Ok(Some(edits))
    }

    async fn range_formatting(
        &self,
        params: DocumentRangeFormattingParams,
    ) -> Result<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;
        let Some(text) = self.documents.get(&uri).await else {
            debug!(%uri, "range formatting requested for unknown document");
            return Ok(Some(Vec::new()));
        };
        let settings = self.settings_for(&uri).await;
        match self
            .features
            .format_range(&text, params.range, &params.options, &settings)
        {
            Ok(edits) => {
                debug!(%uri, edits = edits.len(), "formatted range");
                Ok(Some(edits))
            }
            Err(err) => {
                warn!(%uri, %err, "range formatting failed");
                Ok(Some(Vec::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::formatting::apply_text_edits;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::Notify;
    use tower_lsp::lsp_types::{
        ClientCapabilities, Position, TextDocumentContentChangeEvent, TextDocumentIdentifier,
        VersionedTextDocumentIdentifier, WorkspaceClientCapabilities,
    };
    use tower_lsp::LanguageServer;

    #[derive(Clone, Default)]
    struct NoopClient;

    #[async_trait]
    impl LspClient for NoopClient {
        async fn fetch_settings(&self, _: &Url) -> Option<Value> {
            None
        }
    }

    /// Client answering every settings pull with the same object.
    #[derive(Clone)]
    struct ConfiguredClient {
        settings: Value,
        fetches: Arc<AtomicUsize>,
    }

    impl ConfiguredClient {
        fn new(settings: Value) -> Self {
            Self {
                settings,
                fetches: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl LspClient for ConfiguredClient {
        async fn fetch_settings(&self, _: &Url) -> Option<Value> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Some(self.settings.clone())
        }
    }

    /// Client whose settings pull stalls until the test releases it.
    #[derive(Clone)]
    struct StallingClient {
        started: Arc<Notify>,
        release: Arc<Notify>,
        fetches: Arc<AtomicUsize>,
    }

    impl StallingClient {
        fn new() -> Self {
            Self {
                started: Arc::new(Notify::new()),
                release: Arc::new(Notify::new()),
                fetches: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl LspClient for StallingClient {
        async fn fetch_settings(&self, _: &Url) -> Option<Value> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            self.release.notified().await;
            Some(json!({"enable": false}))
        }
    }

    #[derive(Default)]
    struct MockFeatureProvider {
        document_called: AtomicUsize,
        range_called: AtomicUsize,
        last_settings: Mutex<Option<FormatSettings>>,
    }

    impl FeatureProvider for MockFeatureProvider {
        fn format_document(
            &self,
            _: &str,
            _: &FormattingOptions,
            settings: &FormatSettings,
        ) -> Vec<TextEdit> {
            self.document_called.fetch_add(1, Ordering::SeqCst);
            *self.last_settings.lock().unwrap() = Some(settings.clone());
            vec![TextEdit {
                range: Range::default(),
                new_text: "formatted".into(),
            }]
        }

        fn format_range(
            &self,
            _: &str,
            _: Range,
            _: &FormattingOptions,
            _: &FormatSettings,
        ) -> std::result::Result<Vec<TextEdit>, FormatError> {
            self.range_called.fetch_add(1, Ordering::SeqCst);
            Err(FormatError::RangeInverted { start: 2, end: 1 })
        }
    }

    const SAMPLE: &str = "<root><child/></root>";

    fn sample_uri() -> Url {
        Url::parse("file:///sample.xml").unwrap()
    }

    fn formatting_params() -> DocumentFormattingParams {
        DocumentFormattingParams {
            text_document: TextDocumentIdentifier { uri: sample_uri() },
            options: FormattingOptions {
                tab_size: 2,
                insert_spaces: true,
                ..FormattingOptions::default()
            },
            work_done_progress_params: Default::default(),
        }
    }

    fn range_params(range: Range) -> DocumentRangeFormattingParams {
        DocumentRangeFormattingParams {
            text_document: TextDocumentIdentifier { uri: sample_uri() },
            range,
            options: FormattingOptions {
                tab_size: 2,
                insert_spaces: true,
                ..FormattingOptions::default()
            },
            work_done_progress_params: Default::default(),
        }
    }

    fn pulling_client() -> InitializeParams {
        InitializeParams {
            capabilities: ClientCapabilities {
                workspace: Some(WorkspaceClientCapabilities {
                    configuration: Some(true),
                    ..WorkspaceClientCapabilities::default()
                }),
                ..ClientCapabilities::default()
            },
            ..InitializeParams::default()
        }
    }

    async fn open_sample<C: LspClient, P: FeatureProvider>(
        server: &XmlLanguageServer<C, P>,
        text: &str,
    ) {
        server
            .did_open(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: sample_uri(),
                    language_id: "xml".into(),
                    version: 1,
                    text: text.to_string(),
                },
            })
            .await;
    }

    #[tokio::test]
    async fn initialize_advertises_formatting() {
        let server = XmlLanguageServer::with_features(
            NoopClient,
            Arc::new(DefaultFeatureProvider::new()),
            FormatSettings::default(),
        );
        let result = server
            .initialize(InitializeParams::default())
            .await
            .unwrap();
        let capabilities = result.capabilities;
        assert_eq!(
            capabilities.document_formatting_provider,
            Some(OneOf::Left(true))
        );
        assert_eq!(
            capabilities.document_range_formatting_provider,
            Some(OneOf::Left(true))
        );
        assert_eq!(
            capabilities.text_document_sync,
            Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL))
        );
    }

    #[tokio::test]
    async fn formatting_calls_feature_layer() {
        let provider = Arc::new(MockFeatureProvider::default());
        let server =
            XmlLanguageServer::with_features(NoopClient, provider.clone(), FormatSettings::default());
        open_sample(&server, SAMPLE).await;

        let edits = server
            .formatting(formatting_params())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(edits.len(), 1);
        assert_eq!(provider.document_called.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn formatting_returns_empty_list_when_document_missing() {
        let provider = Arc::new(MockFeatureProvider::default());
        let server =
            XmlLanguageServer::with_features(NoopClient, provider.clone(), FormatSettings::default());

        let edits = server
            .formatting(formatting_params())
            .await
            .unwrap()
            .unwrap();

        assert!(edits.is_empty());
        assert_eq!(provider.document_called.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn range_formatting_errors_become_empty_lists() {
        let provider = Arc::new(MockFeatureProvider::default());
        let server =
            XmlLanguageServer::with_features(NoopClient, provider.clone(), FormatSettings::default());
        open_sample(&server, SAMPLE).await;

        let edits = server
            .range_formatting(range_params(Range::default()))
            .await
            .unwrap()
            .unwrap();

        assert!(edits.is_empty());
        assert_eq!(provider.range_called.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn formats_open_document_end_to_end() {
        let server = XmlLanguageServer::with_features(
            NoopClient,
            Arc::new(DefaultFeatureProvider::new()),
            FormatSettings::default(),
        );
        open_sample(&server, SAMPLE).await;

        let edits = server
            .formatting(formatting_params())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            apply_text_edits(SAMPLE, &edits),
            "<root>\n  <child/>\n</root>"
        );
    }

    #[tokio::test]
    async fn range_formatting_end_to_end() {
        let source = "<root>\n<a><b/></a>\n<c><d/></c>\n</root>";
        let server = XmlLanguageServer::with_features(
            NoopClient,
            Arc::new(DefaultFeatureProvider::new()),
            FormatSettings::default(),
        );
        open_sample(&server, source).await;

        let range = Range {
            start: Position::new(2, 0),
            end: Position::new(3, 0),
        };
        let edits = server
            .range_formatting(range_params(range))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            apply_text_edits(source, &edits),
            "<root>\n<a><b/></a>\n<c>\n  <d/>\n</c>\n</root>"
        );
    }

    #[tokio::test]
    async fn did_change_replaces_document_text() {
        let server = XmlLanguageServer::with_features(
            NoopClient,
            Arc::new(DefaultFeatureProvider::new()),
            FormatSettings::default(),
        );
        open_sample(&server, SAMPLE).await;
        server
            .did_change(DidChangeTextDocumentParams {
                text_document: VersionedTextDocumentIdentifier {
                    uri: sample_uri(),
                    version: 2,
                },
                content_changes: vec![TextDocumentContentChangeEvent {
                    range: None,
                    range_length: None,
                    text: "<a>\n  <b/>\n</a>".into(),
                }],
            })
            .await;

        let edits = server
            .formatting(formatting_params())
            .await
            .unwrap()
            .unwrap();
        assert!(edits.is_empty());
    }

    #[tokio::test]
    async fn client_settings_are_merged_and_cached() {
        let client = ConfiguredClient::new(json!({"enable": false}));
        let fetches = client.fetches.clone();
        let provider = Arc::new(MockFeatureProvider::default());
        let base = FormatSettings {
            max_preserve_new_lines: Some(3),
            ..FormatSettings::default()
        };
        let server = XmlLanguageServer::with_features(client, provider.clone(), base);
        server.initialize(pulling_client()).await.unwrap();
        open_sample(&server, SAMPLE).await;

        server.formatting(formatting_params()).await.unwrap();
        server.formatting(formatting_params()).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        let seen = provider.last_settings.lock().unwrap().clone().unwrap();
        assert!(!seen.enabled);
        assert_eq!(seen.max_preserve_new_lines, Some(3));
    }

    #[tokio::test]
    async fn configuration_change_drops_cached_settings() {
        let client = ConfiguredClient::new(json!({}));
        let fetches = client.fetches.clone();
        let server = XmlLanguageServer::with_features(
            client,
            Arc::new(MockFeatureProvider::default()),
            FormatSettings::default(),
        );
        server.initialize(pulling_client()).await.unwrap();
        open_sample(&server, SAMPLE).await;

        server.formatting(formatting_params()).await.unwrap();
        server
            .did_change_configuration(DidChangeConfigurationParams { settings: json!({}) })
            .await;
        assert!(server.settings.is_empty().await);
        server.formatting(formatting_params()).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn settings_resolved_across_a_configuration_change_are_not_cached() {
        let client = StallingClient::new();
        let (started, release, fetches) = (
            client.started.clone(),
            client.release.clone(),
            client.fetches.clone(),
        );
        let provider = Arc::new(MockFeatureProvider::default());
        let server = XmlLanguageServer::with_features(client, provider, FormatSettings::default());
        server.initialize(pulling_client()).await.unwrap();
        open_sample(&server, SAMPLE).await;

        let (formatted, ()) = tokio::join!(server.formatting(formatting_params()), async {
            started.notified().await;
            server
                .did_change_configuration(DidChangeConfigurationParams { settings: json!({}) })
                .await;
            release.notify_one();
        });
        assert!(formatted.unwrap().is_some());
        assert!(server.settings.is_empty().await);

        release.notify_one();
        server.formatting(formatting_params()).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(server.settings.len().await, 1);
    }

    #[tokio::test]
    async fn closing_a_document_forgets_it() {
        let client = ConfiguredClient::new(json!({}));
        let server = XmlLanguageServer::with_features(
            client,
            Arc::new(MockFeatureProvider::default()),
            FormatSettings::default(),
        );
        server.initialize(pulling_client()).await.unwrap();
        open_sample(&server, SAMPLE).await;
        server.formatting(formatting_params()).await.unwrap();
        assert_eq!(server.settings.len().await, 1);

        server
            .did_close(DidCloseTextDocumentParams {
                text_document: TextDocumentIdentifier { uri: sample_uri() },
            })
            .await;
        assert!(server.settings.is_empty().await);
        let edits = server
            .formatting(formatting_params())
            .await
            .unwrap()
            .unwrap();
        assert!(edits.is_empty());
    }

    #[tokio::test]
    async fn settings_are_not_pulled_without_client_support() {
        let client = ConfiguredClient::new(json!({"enable": false}));
        let fetches = client.fetches.clone();
        let server = XmlLanguageServer::with_features(
            client,
            Arc::new(DefaultFeatureProvider::new()),
            FormatSettings::default(),
        );
        server
            .initialize(InitializeParams::default())
            .await
            .unwrap();
        open_sample(&server, SAMPLE).await;

        let edits = server
            .formatting(formatting_params())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edits.len(), 1);
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
    }
}
