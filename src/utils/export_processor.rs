use crate::config::ExportConfig;
use crate::core::flatten::Flattener;
use crate::core::mapper::StructureMapper;
use crate::core::writer::{Writer, XmlTreeWriter};
use crate::error::ExportError;
use crate::transport::{parse_annotation_id, ErrorResponse, HookResponse, Payload, WebhookSink};
use anyhow::Result;
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Settings part of a hook invocation: what to export and how.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    pub annotation_id: Value,
    /// Annotation content as fetched from the extraction service
    pub annotation: Value,
    /// Raw hook configuration, parsed by [`ExportConfig::from_json_value`]
    pub config: Value,
}

pub struct ExportProcessor<S: WebhookSink> {
    flattener: Flattener,
    writer: XmlTreeWriter,
    sink: S,
}

impl<S: WebhookSink> ExportProcessor<S> {
    pub fn new(sink: S) -> Self {
        Self {
            flattener: Flattener::new(),
            writer: XmlTreeWriter::new(),
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Flatten, map and serialize one annotation
    pub fn render_xml(&self, annotation: &Value, config: &ExportConfig) -> Result<String, ExportError> {
        let table = self.flattener.flatten(annotation);
        debug!("Flat table holds {} fields", table.len());

        let structure = config.structure();
        let missing: Vec<&str> = structure
            .referenced_fields()
            .into_iter()
            .filter(|field| !table.contains(field))
            .collect();
        if !missing.is_empty() {
            debug!("Fields without data, using placeholders: {}", missing.join(", "));
        }

        let mapper = StructureMapper::with_options(config.mapper_options());
        let tree = mapper.map(&structure, &table);

        self.writer.write_document(&config.xml.root, &tree)
    }

    /// Produce the transport payload for one annotation
    pub fn export(
        &self,
        annotation_id: &Value,
        annotation: &Value,
        config: &ExportConfig,
    ) -> Result<Payload, ExportError> {
        let annotation_id = parse_annotation_id(annotation_id)?;
        info!("Exporting annotation {}", annotation_id);

        let xml = self.render_xml(annotation, config)?;
        info!("Generated {} bytes of XML for annotation {}", xml.len(), annotation_id);

        Ok(Payload::new(annotation_id, &xml))
    }

    /// Run a full hook invocation. Failures come back as an error response,
    /// never as a panic or `Err`.
    pub fn handle(&self, request: &ExportRequest) -> HookResponse {
        let outcome = ExportConfig::from_json_value(&request.config).and_then(|config| {
            let payload = self.export(&request.annotation_id, &request.annotation, &config)?;
            Ok((config, payload))
        });

        let (config, payload) = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!("Export failed: {}", e);
                return HookResponse::Failed(ErrorResponse::new(e.to_string()));
            }
        };

        match config.webhook_url() {
            Some(url) => match self.sink.deliver(url, &payload) {
                Ok(_) => info!("Delivered annotation {} to {}", payload.annotation_id, url),
                // The document exists either way; delivery is best effort
                Err(e) => error!("Error posting to webhook {}: {}", url, e),
            },
            None => warn!("No webhook url configured, skipping delivery"),
        }

        HookResponse::Exported(payload)
    }
}

/// Export every `*.json` annotation in `input_dir` to a sibling `.xml` file.
/// Returns how many files were written.
pub fn run_export_directory<P: AsRef<Path>>(input_dir: P, config: &ExportConfig) -> Result<usize> {
    let input_path = input_dir.as_ref();
    let processor = ExportProcessor::new(crate::transport::LogSink);
    let mut written = 0;

    info!("Starting to export annotations from: {}", input_path.display());

    let entries = fs::read_dir(input_path)
        .map_err(|e| anyhow::anyhow!("Failed to read input directory: {}", e))?;

    for entry in entries {
        let entry = entry.map_err(|e| anyhow::anyhow!("Failed to read directory entry: {}", e))?;
        let file_path = entry.path();

        if !file_path.is_file() || file_path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            debug!("Skipping entry: {:?}", file_path.file_name());
            continue;
        }

        let annotation: Value = match fs::read_to_string(&file_path)
            .map_err(anyhow::Error::from)
            .and_then(|text| serde_json::from_str(&text).map_err(anyhow::Error::from))
        {
            Ok(annotation) => annotation,
            Err(e) => {
                error!("Failed to load annotation {:?}: {}", file_path.file_name(), e);
                continue;
            }
        };

        let xml = match processor.render_xml(&annotation, config) {
            Ok(xml) => xml,
            Err(e) => {
                error!("Failed to export {:?}: {}", file_path.file_name(), e);
                continue;
            }
        };

        let output_path = file_path.with_extension("xml");
        if let Err(e) = fs::write(&output_path, xml) {
            error!("Failed to write {}: {}", output_path.display(), e);
            continue;
        }
        info!("Wrote {}", output_path.display());
        written += 1;
    }

    info!("Completed export of {} annotations", written);
    Ok(written)
}
