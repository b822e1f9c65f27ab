//! Line-by-line driver that feeds build output through the enabled grammars.
//!
//! stdout and stderr are independent channels: each owns a fresh set of
//! matchers and its own sticky pointer, so a half-built diagnostic on one
//! channel is never finalized by chatter on the other.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::e_decode::LineDecoder;
use crate::e_diagnostic::{Range, RawDiagnostic};
use crate::e_linematcher::LineMatcher;
use crate::e_registry::GrammarRegistry;
use crate::e_resolver::{PathResolver, ResolvedDiagnostic};

pub type DiagnosticCallback = Box<dyn FnMut(&RawDiagnostic) + Send>;

type Identity = (String, String, Range, String);

/// Which pipe a line arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Output,
    Error,
}

struct ChannelState {
    matchers: Vec<Box<dyn LineMatcher>>,
    sticky: Option<usize>,
}

impl ChannelState {
    fn new(registry: Option<&GrammarRegistry>) -> Self {
        ChannelState {
            matchers: registry.map(|r| r.instantiate()).unwrap_or_default(),
            sticky: None,
        }
    }

    /// Run one line through the grammars; returns finalized diagnostics in
    /// the order they must be recorded.
    fn dispatch(&mut self, line: &str) -> Vec<RawDiagnostic> {
        let mut found = Vec::new();
        let mut order: Vec<usize> = Vec::with_capacity(self.matchers.len());
        if let Some(s) = self.sticky {
            order.push(s);
        }
        order.extend((0..self.matchers.len()).filter(|i| Some(*i) != self.sticky));

        let mut claim = None;
        for idx in order {
            let m = self.matchers[idx].parse_line(line);
            if m.matched {
                log::trace!("[{}] claimed: {}", self.matchers[idx].name(), line);
                claim = Some((idx, m.diagnostic));
                break;
            }
            // Rejected, but the line may still have ended a pending block.
            found.extend(m.diagnostic);
        }

        if let Some((winner, diagnostic)) = claim {
            // A claimed line is a boundary for everyone else on this channel.
            for (idx, matcher) in self.matchers.iter_mut().enumerate() {
                if idx != winner {
                    found.extend(matcher.flush());
                }
            }
            found.extend(diagnostic);
            self.sticky = Some(winner);
        }
        found
    }

    fn close(&mut self) -> Vec<RawDiagnostic> {
        self.sticky = None;
        self.matchers.iter_mut().filter_map(|m| m.flush()).collect()
    }
}

/// Accumulates diagnostics from one subprocess run.
pub struct OutputConsumer {
    stdout: ChannelState,
    stderr: ChannelState,
    enabled: bool,
    decoder: LineDecoder,
    diagnostics: Vec<RawDiagnostic>,
    seen: HashSet<Identity>,
    subscribers: Vec<DiagnosticCallback>,
}

impl std::fmt::Debug for OutputConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputConsumer")
            .field("enabled", &self.enabled)
            .field("grammars", &self.stdout.matchers.len())
            .field("diagnostics", &self.diagnostics.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl OutputConsumer {
    /// A consumer running every grammar the registry has enabled.
    pub fn new(registry: &GrammarRegistry) -> Self {
        Self::build(Some(registry))
    }

    /// A consumer that accepts output but never records anything.
    pub fn disabled() -> Self {
        Self::build(None)
    }

    fn build(registry: Option<&GrammarRegistry>) -> Self {
        OutputConsumer {
            stdout: ChannelState::new(registry),
            stderr: ChannelState::new(registry),
            enabled: registry.is_some(),
            decoder: LineDecoder::default(),
            diagnostics: Vec::new(),
            seen: HashSet::new(),
            subscribers: Vec::new(),
        }
    }

    /// Decode raw byte lines with `decoder` instead of UTF-8.
    pub fn with_decoder(mut self, decoder: LineDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn decoder(&self) -> &LineDecoder {
        &self.decoder
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Subscribe to diagnostics as they are finalized, in finalization order.
    pub fn on_diagnostic<F>(&mut self, callback: F)
    where
        F: FnMut(&RawDiagnostic) + Send + 'static,
    {
        self.subscribers.push(Box::new(callback));
    }

    /// Feed one stdout line. Text containing newlines is split first.
    pub fn output(&mut self, line: &str) {
        self.feed(Channel::Output, line);
    }

    /// Feed one stderr line. Text containing newlines is split first.
    pub fn error(&mut self, line: &str) {
        self.feed(Channel::Error, line);
    }

    /// Feed one undecoded line; the configured encoding is applied.
    pub fn output_bytes(&mut self, bytes: &[u8]) {
        let line = self.decoder.decode(bytes);
        self.feed(Channel::Output, &line);
    }

    pub fn error_bytes(&mut self, bytes: &[u8]) {
        let line = self.decoder.decode(bytes);
        self.feed(Channel::Error, &line);
    }

    pub fn feed(&mut self, channel: Channel, text: &str) {
        if !self.enabled {
            return;
        }
        if text.is_empty() {
            self.dispatch(channel, "");
            return;
        }
        for line in text.lines() {
            self.dispatch(channel, line);
        }
    }

    fn dispatch(&mut self, channel: Channel, line: &str) {
        let found = self.channel_mut(channel).dispatch(line);
        for diag in found {
            self.record(diag);
        }
    }

    fn channel_mut(&mut self, channel: Channel) -> &mut ChannelState {
        match channel {
            Channel::Output => &mut self.stdout,
            Channel::Error => &mut self.stderr,
        }
    }

    /// The stdout pipe reached EOF: finalize whatever it was building.
    pub fn close_output(&mut self) {
        self.close(Channel::Output);
    }

    /// The stderr pipe reached EOF: finalize whatever it was building.
    pub fn close_error(&mut self) {
        self.close(Channel::Error);
    }

    pub fn close(&mut self, channel: Channel) {
        let flushed = self.channel_mut(channel).close();
        for diag in flushed {
            self.record(diag);
        }
    }

    /// Process finished (or was killed): flush both channels.
    pub fn finish(&mut self) {
        self.close_output();
        self.close_error();
    }

    fn record(&mut self, diag: RawDiagnostic) {
        if !self.seen.insert(diag.identity()) {
            log::trace!("duplicate diagnostic dropped: {}", diag);
            return;
        }
        log::debug!("diagnostic: {}", diag);
        for callback in self.subscribers.iter_mut() {
            callback(&diag);
        }
        self.diagnostics.push(diag);
    }

    /// Everything recorded so far, in detection order.
    pub fn diagnostics(&self) -> &[RawDiagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<RawDiagnostic> {
        self.diagnostics
    }

    /// Anchor the recorded diagnostics to files on disk.
    pub fn resolve_diagnostics(
        &self,
        resolver: &PathResolver,
        base_dirs: &[PathBuf],
    ) -> anyhow::Result<Vec<ResolvedDiagnostic>> {
        resolver.resolve(&self.diagnostics, base_dirs)
    }
}
