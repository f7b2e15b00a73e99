use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info};

use super::ini::IniDocument;
use super::MANAGED_HEADER;
use crate::fs::{read_optional, write_atomic, SHARED_READ};

/// The optional HTTP control panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InetHttpServer {
    /// `host:port`, e.g. `127.0.0.1:9001` or `*:9001`.
    pub port: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl InetHttpServer {
    fn client_url(&self) -> String {
        let local = match self.port.split_once(':') {
            Some(("*" | "" | "0.0.0.0", port)) => format!("127.0.0.1:{port}"),
            Some(_) => self.port.clone(),
            None => format!("127.0.0.1:{}", self.port),
        };
        format!("http://{local}")
    }
}

/// Global daemon settings written into a freshly generated primary config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimarySettings {
    pub nodaemon: bool,
    pub logfile: PathBuf,
    pub pidfile: PathBuf,
    pub socket: PathBuf,
    pub user: String,
    pub inet: Option<InetHttpServer>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncludeMerge {
    /// The primary config did not exist and was written in full.
    Created,
    /// An `[include]` section was appended.
    SectionAppended,
    /// A `files =` line was inserted directly under the `[include]` header.
    Inserted,
    AlreadyPresent,
}

impl IncludeMerge {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IncludeMerge::Created => "created",
            IncludeMerge::SectionAppended => "section-appended",
            IncludeMerge::Inserted => "inserted",
            IncludeMerge::AlreadyPresent => "already-present",
        }
    }
}

/// Renders a complete primary config whose `[include]` lists `include`.
#[must_use]
pub fn render_primary(settings: &PrimarySettings, include: &str) -> String {
    let mut out = String::new();
    out.push_str(MANAGED_HEADER);
    out.push_str("; program definitions live in the [include]d fragments\n");

    out.push_str("[supervisord]\n");
    out.push_str(&format!("nodaemon={}\n", settings.nodaemon));
    out.push_str(&format!("logfile={}\n", settings.logfile.display()));
    out.push_str(&format!("pidfile={}\n", settings.pidfile.display()));
    out.push_str(&format!("user={}\n\n", settings.user));

    out.push_str("[unix_http_server]\n");
    out.push_str(&format!("file={}\n", settings.socket.display()));
    out.push_str("chmod=0700\n\n");

    if let Some(inet) = &settings.inet {
        out.push_str("[inet_http_server]\n");
        out.push_str(&format!("port={}\n", inet.port));
        push_credentials(&mut out, inet);
        out.push('\n');
    }

    out.push_str("[rpcinterface:supervisor]\n");
    out.push_str(
        "supervisor.rpcinterface_factory = supervisor.rpcinterface:make_main_rpcinterface\n\n",
    );

    out.push_str("[supervisorctl]\n");
    match &settings.inet {
        Some(inet) => {
            out.push_str(&format!("serverurl={}\n", inet.client_url()));
            push_credentials(&mut out, inet);
        }
        None => out.push_str(&format!("serverurl=unix://{}\n", settings.socket.display())),
    }
    out.push('\n');

    out.push_str("[include]\n");
    out.push_str(&format!("files = {include}\n"));
    out
}

fn push_credentials(out: &mut String, inet: &InetHttpServer) {
    if let Some(username) = &inet.username {
        out.push_str(&format!("username={username}\n"));
    }
    if let Some(password) = &inet.password {
        out.push_str(&format!("password={password}\n"));
    }
}

/// Adds `include` to the document's `[include]` section.
///
/// Nothing changes when `include` already appears anywhere in the file.
/// Otherwise a `files = <include>` line goes directly under an existing
/// `[include]` header, or a new section is appended at the end.
pub fn merge_include(doc: &mut IniDocument, include: &str) -> IncludeMerge {
    if doc.contains_text(include) {
        return IncludeMerge::AlreadyPresent;
    }
    let line = format!("files = {include}");
    if let Some(header) = doc.section_header_index("include") {
        doc.insert_line(header + 1, line);
        return IncludeMerge::Inserted;
    }
    if !doc.ends_with_blank_line() {
        doc.push_line("");
    }
    doc.push_line("[include]");
    doc.push_line(line);
    IncludeMerge::SectionAppended
}

/// Writes the primary config if it is missing, otherwise merges `include`
/// into it and leaves every other line untouched.
pub fn ensure_primary_config(
    path: &Path,
    settings: &PrimarySettings,
    include: &str,
) -> Result<IncludeMerge> {
    let Some(existing) = read_optional(path)? else {
        write_atomic(path, render_primary(settings, include).as_bytes(), SHARED_READ)?;
        info!(config = %path.display(), "supervisor config written");
        return Ok(IncludeMerge::Created);
    };

    let mut doc = IniDocument::parse(&existing);
    let merge = merge_include(&mut doc, include);
    if merge == IncludeMerge::AlreadyPresent {
        debug!(config = %path.display(), include, "include already present");
    } else {
        write_atomic(path, doc.render().as_bytes(), SHARED_READ)?;
        info!(config = %path.display(), include, merge = merge.as_str(), "supervisor include merged");
    }
    Ok(merge)
}
