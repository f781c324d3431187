//! Command execution for `repogallery_cli`. Output goes to the supplied writer;
//! the large-file prompt is delegated to the caller.

use std::io::Write;
use std::sync::Arc;

use tracing::warn;

use crate::about::{AboutDocument, AboutSource};
use crate::admin::AdminGate;
use crate::config::{Category, GalleryConfig};
use crate::error::{AppError, AppResult};
use crate::gallery::GalleryRenderer;
use crate::settings::{ConnectionSettings, KvAdapter, SettingsStore};
use crate::store::{ContentApi, ContentClient};
use crate::upload::{LargeFileNotice, LocalFile, UploadError, UploadOutcome, UploadRequest, Uploader};

use super::args::{AboutInput, Command, SettingsPatch};
use super::table::render_gallery;

pub struct CliContext<A, K> {
    pub api: A,
    pub settings: Arc<SettingsStore<K>>,
    pub config: GalleryConfig,
    /// Table width for `list` and post-upload refresh.
    pub width: usize,
}

fn io_err(e: std::io::Error) -> AppError {
    AppError::io("output".to_string(), e.to_string())
}

fn mask_token(token: &str) -> String {
    let t = token.trim();
    if t.is_empty() {
        return "(none)".to_string();
    }
    let tail: String = t.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{}", tail)
}

fn apply_patch(mut current: ConnectionSettings, patch: SettingsPatch) -> ConnectionSettings {
    if let Some(v) = patch.owner { current.owner = v; }
    if let Some(v) = patch.repo { current.repo = v; }
    if let Some(v) = patch.branch { current.branch = v; }
    if let Some(v) = patch.token { current.token = v; }
    current
}

impl<A: ContentApi + Clone, K: KvAdapter> CliContext<A, K> {
    fn client(&self) -> AppResult<Arc<ContentClient<A>>> {
        let target = self.config.target(&self.settings.load())?;
        Ok(Arc::new(ContentClient::new(self.api.clone(), target, self.config.request_timeout())))
    }

    pub async fn execute<W: Write>(
        &self,
        command: Command,
        out: &mut W,
        confirm: &mut dyn FnMut(&LargeFileNotice) -> bool,
    ) -> AppResult<()> {
        // a missing file is reported before the credential gate
        if matches!(command, Command::Upload { file: None, .. }) {
            return Err(UploadError::NoFileSelected.into());
        }
        if command.needs_admin() {
            AdminGate::from_settings(&self.settings.load()).require_open(match &command {
                Command::Upload { .. } => "upload",
                _ => "about publish",
            })?;
        }

        match command {
            Command::Help => Ok(()),
            Command::SettingsShow => self.settings_show(out),
            Command::SettingsSave(patch) => {
                let merged = apply_patch(self.settings.load(), patch);
                self.settings.save(&merged);
                writeln!(out, "Settings saved").map_err(io_err)
            }
            Command::SettingsClear => {
                self.settings.clear();
                writeln!(out, "Settings cleared").map_err(io_err)
            }
            Command::Upload { category, file, description, assume_yes } => {
                let file = match file {
                    Some(path) => Some(LocalFile::read(&path).await.map_err(|e| {
                        AppError::user("file_unreadable".to_string(), format!("cannot read {}: {}", path.display(), e))
                    })?),
                    None => None,
                };
                let client = self.client()?;
                let uploader = Uploader::new(client.clone(), &self.config);
                let request = UploadRequest { category, file, description };
                let outcome = uploader
                    .upload(request, |notice: &LargeFileNotice| assume_yes || confirm(notice))
                    .await?;
                match &outcome {
                    UploadOutcome::Complete { plan, .. } => {
                        writeln!(out, "Upload complete: {}", plan.media_path).map_err(io_err)?;
                    }
                    UploadOutcome::Partial { plan, metadata_error, .. } => {
                        warn!(target: "repogallery::upload", "description for {} not saved: {}", plan.media_path, metadata_error);
                        writeln!(out, "Uploaded {} but its description could not be saved: {}", plan.media_path, metadata_error)
                            .map_err(io_err)?;
                    }
                }
                self.print_gallery(client, outcome.plan().category, out).await
            }
            Command::List { category } => {
                let client = self.client()?;
                let categories = match category {
                    Some(c) => vec![c],
                    None => Category::EVERY.to_vec(),
                };
                for c in categories {
                    self.print_gallery(client.clone(), c, out).await?;
                }
                Ok(())
            }
            Command::AboutShow => {
                let doc = AboutDocument::new(self.client()?, self.settings.clone());
                let about = doc.load().await;
                match about.source {
                    AboutSource::Empty => writeln!(out, "(no about text)"),
                    AboutSource::Cache => writeln!(out, "{}\n(from local cache)", about.text),
                    AboutSource::Remote => writeln!(out, "{}", about.text),
                }
                .map_err(io_err)
            }
            Command::AboutPublish(input) => {
                let text = match input {
                    AboutInput::Text(t) => t,
                    AboutInput::File(path) => tokio::fs::read_to_string(&path).await.map_err(|e| {
                        AppError::user("file_unreadable".to_string(), format!("cannot read {}: {}", path.display(), e))
                    })?,
                };
                let doc = AboutDocument::new(self.client()?, self.settings.clone());
                doc.publish(&text).await?;
                writeln!(out, "About saved").map_err(io_err)
            }
        }
    }

    fn settings_show<W: Write>(&self, out: &mut W) -> AppResult<()> {
        let stored = self.settings.load();
        let effective = self.config.effective(&stored);
        let shown = |own: &str, eff: &str| {
            if own.trim().is_empty() { format!("{} (default)", eff) } else { eff.to_string() }
        };
        writeln!(out, "owner:  {}", shown(&stored.owner, &effective.owner)).map_err(io_err)?;
        writeln!(out, "repo:   {}", shown(&stored.repo, &effective.repo)).map_err(io_err)?;
        writeln!(out, "branch: {}", shown(&stored.branch, &effective.branch)).map_err(io_err)?;
        writeln!(out, "token:  {}", mask_token(&stored.token)).map_err(io_err)?;
        let admin = if AdminGate::from_settings(&stored).is_open() { "yes" } else { "no" };
        writeln!(out, "admin:  {}", admin).map_err(io_err)
    }

    async fn print_gallery<W: Write>(&self, client: Arc<ContentClient<A>>, category: Category, out: &mut W) -> AppResult<()> {
        let gallery = GalleryRenderer::new(client, &self.config).render(category).await;
        for line in render_gallery(&gallery, self.width) {
            writeln!(out, "{}", line).map_err(io_err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
