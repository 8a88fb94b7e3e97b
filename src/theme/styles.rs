//! Global CSS styles for DefraNotes.
//!
//! Quiet editor aesthetic: dark chrome, calm accents, the note itself as
//! the brightest thing on screen.

pub const GLOBAL_STYLES: &str = r#"
/* === CSS Custom Properties === */
:root {
  /* Surfaces */
  --surface-base: #15171a;
  --surface-raised: #1c1f23;
  --surface-border: #2a2e33;

  /* Accents */
  --accent: #4f9cf0;
  --accent-glow: rgba(79, 156, 240, 0.25);

  /* Status */
  --ok: #5fbf77;
  --busy: #e0b34d;
  --bad: #e06363;
  --idle: #8a9099;

  /* Text */
  --text-primary: #e8eaed;
  --text-secondary: rgba(232, 234, 237, 0.7);
  --text-muted: rgba(232, 234, 237, 0.45);

  /* Typography */
  --font-ui: 'Inter', 'Segoe UI', system-ui, sans-serif;
  --font-mono: 'JetBrains Mono', 'SF Mono', 'Consolas', monospace;

  /* Transitions */
  --transition-fast: 150ms ease;
  --transition-normal: 300ms ease;
}

/* === Global Reset === */
*, *::before, *::after {
  box-sizing: border-box;
  margin: 0;
  padding: 0;
}

html {
  font-size: 16px;
  -webkit-font-smoothing: antialiased;
}

body {
  font-family: var(--font-ui);
  background: var(--surface-base);
  color: var(--text-primary);
  line-height: 1.6;
  min-height: 100vh;
}

button {
  font: inherit;
  cursor: pointer;
  border: none;
  background: none;
  color: inherit;
}

input, textarea {
  font: inherit;
  color: inherit;
  background: none;
  border: none;
  outline: none;
}

/* === Layout === */
.workspace {
  display: flex;
  flex-direction: column;
  height: 100vh;
}

.workspace-body {
  display: flex;
  flex: 1;
  min-height: 0;
}

.startup-screen {
  display: flex;
  align-items: center;
  justify-content: center;
  height: 100vh;
}

.startup-message {
  color: var(--text-secondary);
  font-family: var(--font-mono);
  animation: pulse 1.6s ease-in-out infinite;
}

@keyframes pulse {
  0%, 100% { opacity: 0.5; }
  50% { opacity: 1; }
}

/* === Header === */
.app-header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  padding: 0.75rem 1.25rem;
  background: var(--surface-raised);
  border-bottom: 1px solid var(--surface-border);
}

.app-title {
  font-size: 1.1rem;
  font-weight: 600;
  letter-spacing: 0.02em;
}

.header-status {
  display: flex;
  align-items: center;
  gap: 1rem;
}

.status-badge {
  font-family: var(--font-mono);
  font-size: 0.75rem;
  padding: 0.2rem 0.6rem;
  border-radius: 999px;
  border: 1px solid var(--surface-border);
  max-width: 18rem;
  overflow: hidden;
  text-overflow: ellipsis;
  white-space: nowrap;
}

.status-badge.synced { color: var(--ok); border-color: var(--ok); }
.status-badge.syncing { color: var(--busy); border-color: var(--busy); }
.status-badge.connecting { color: var(--idle); }
.status-badge.error { color: var(--bad); border-color: var(--bad); }
.status-badge.offline { color: var(--idle); border-color: var(--idle); }

.peer-button {
  display: flex;
  align-items: center;
  gap: 0.4rem;
  font-size: 0.8rem;
  color: var(--text-secondary);
  padding: 0.2rem 0.5rem;
  border-radius: 4px;
  transition: background var(--transition-fast);
}

.peer-button:hover {
  background: var(--surface-border);
}

.peer-dot {
  width: 8px;
  height: 8px;
  border-radius: 50%;
  background: var(--idle);
}

.peer-dot.active { background: var(--ok); box-shadow: 0 0 6px var(--ok); }
.peer-dot.idle { background: var(--accent); }
.peer-dot.loading { background: var(--busy); animation: pulse 1.2s infinite; }
.peer-dot.offline { background: var(--bad); }

.user-name {
  font-size: 0.8rem;
  color: var(--text-muted);
  font-family: var(--font-mono);
}

/* === Sidebar === */
.sidebar {
  width: 280px;
  display: flex;
  flex-direction: column;
  background: var(--surface-raised);
  border-right: 1px solid var(--surface-border);
}

.sidebar-header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  padding: 0.9rem 1rem;
}

.sidebar-title {
  font-size: 0.95rem;
  font-weight: 600;
  color: var(--text-secondary);
}

.btn-primary {
  background: var(--accent);
  color: #10131a;
  font-size: 0.8rem;
  font-weight: 600;
  padding: 0.35rem 0.7rem;
  border-radius: 5px;
  transition: box-shadow var(--transition-fast);
}

.btn-primary:hover {
  box-shadow: 0 0 10px var(--accent-glow);
}

.note-list {
  flex: 1;
  overflow-y: auto;
  padding: 0 0.5rem 0.5rem;
}

.note-row {
  display: flex;
  flex-direction: column;
  align-items: flex-start;
  width: 100%;
  text-align: left;
  padding: 0.55rem 0.6rem;
  border-radius: 6px;
  transition: background var(--transition-fast);
}

.note-row:hover {
  background: var(--surface-border);
}

.note-row.active {
  background: var(--surface-border);
  box-shadow: inset 2px 0 0 var(--accent);
}

.note-row-title {
  font-size: 0.9rem;
  overflow: hidden;
  text-overflow: ellipsis;
  white-space: nowrap;
  max-width: 100%;
}

.note-row-date {
  font-size: 0.7rem;
  font-family: var(--font-mono);
  color: var(--text-muted);
}

.empty-state {
  padding: 1.5rem 1rem;
  font-size: 0.85rem;
  color: var(--text-muted);
  text-align: center;
}

/* === Editor === */
.editor {
  flex: 1;
  display: flex;
  flex-direction: column;
  padding: 1.5rem 2rem 0.75rem;
  min-width: 0;
}

.editor-empty {
  align-items: center;
  justify-content: center;
}

.editor-title {
  font-size: 1.6rem;
  font-weight: 600;
  padding-bottom: 0.75rem;
  border-bottom: 1px solid var(--surface-border);
}

.editor-title::placeholder,
.editor-body::placeholder {
  color: var(--text-muted);
}

.editor-body {
  flex: 1;
  resize: none;
  padding: 1rem 0;
  font-size: 0.95rem;
  line-height: 1.7;
}

.note-history {
  display: flex;
  align-items: center;
  gap: 0.75rem;
  padding: 0.5rem 0;
  border-top: 1px solid var(--surface-border);
  font-family: var(--font-mono);
  font-size: 0.7rem;
  color: var(--text-muted);
}

.note-history-label {
  text-transform: uppercase;
  letter-spacing: 0.08em;
}

.note-history-entry {
  cursor: default;
}

/* === Peer Dialog === */
.modal-overlay {
  position: fixed;
  inset: 0;
  background: rgba(0, 0, 0, 0.55);
  display: flex;
  align-items: center;
  justify-content: center;
  z-index: 100;
}

.modal {
  width: 520px;
  max-width: 90vw;
  max-height: 80vh;
  overflow-y: auto;
  background: var(--surface-raised);
  border: 1px solid var(--surface-border);
  border-radius: 8px;
  padding: 1.25rem;
}

.modal-header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 1rem;
}

.modal-header h2 {
  font-size: 1.1rem;
}

.modal-close {
  font-size: 1.3rem;
  color: var(--text-muted);
  line-height: 1;
}

.modal-close:hover {
  color: var(--text-primary);
}

.modal-section {
  margin-bottom: 1.25rem;
}

.modal-section h3 {
  font-size: 0.85rem;
  color: var(--text-secondary);
  margin-bottom: 0.5rem;
}

.peer-info-block {
  font-family: var(--font-mono);
  font-size: 0.72rem;
  background: var(--surface-base);
  border: 1px solid var(--surface-border);
  border-radius: 6px;
  padding: 0.75rem;
  overflow-x: auto;
  white-space: pre-wrap;
  word-break: break-all;
}

.peer-info-pending {
  font-size: 0.85rem;
  color: var(--text-muted);
}

.connect-row {
  display: flex;
  gap: 0.5rem;
}

.input-field {
  flex: 1;
  background: var(--surface-base);
  border: 1px solid var(--surface-border);
  border-radius: 5px;
  padding: 0.45rem 0.6rem;
  font-size: 0.85rem;
  transition: border-color var(--transition-fast);
}

.input-field:focus {
  border-color: var(--accent);
}

.connect-result {
  margin-top: 0.6rem;
  font-size: 0.8rem;
}

.connect-result.success { color: var(--ok); }
.connect-result.failure { color: var(--bad); }
"#;
