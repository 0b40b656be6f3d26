//! # CLI Command Implementations
//!
//! File handling helpers and the `cmd_*` functions behind each subcommand.

use crate::AppError;
use proofread_core::primitives::{
    DEFAULT_BODY_IGNORE, DEFAULT_SYNAPSE_IGNORE, MAGIC_BYTES,
};
use proofread_core::{
    EdgeEditor, EdgeRange, EditorConfig, InclusionRemover, MAX_PERSISTENCE_PAYLOAD_SIZE,
    RegionGraph, ReviewMode, SchedulerState, SerializableGraph, graph_from_bytes,
    graph_to_bytes,
};
use std::path::{Path, PathBuf};
use tracing::info;

// =============================================================================
// FILE HANDLING
// =============================================================================

/// Maximum size of any input document.
const MAX_INPUT_FILE_SIZE: u64 = MAX_PERSISTENCE_PAYLOAD_SIZE as u64;

/// Output graphs with this extension are written as binary snapshots.
pub const SNAPSHOT_EXTENSION: &str = "prag";

fn validate_file_size(path: &Path, max_size: u64) -> Result<(), AppError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| AppError::Io(format!("Cannot read file metadata: {e}")))?;
    if metadata.len() > max_size {
        return Err(AppError::InvalidInput(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, AppError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| AppError::Io(format!("Invalid file path '{}': {e}", path.display())))?;
    if !canonical.is_file() {
        return Err(AppError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    Ok(canonical)
}

/// Resolve an output path whose parent directory must already exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, AppError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let canonical_parent = parent.canonicalize().map_err(|e| {
        AppError::Io(format!(
            "Invalid output directory '{}': {e}",
            parent.display()
        ))
    })?;
    if !canonical_parent.is_dir() {
        return Err(AppError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }
    let filename = path
        .file_name()
        .ok_or_else(|| AppError::Io("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

fn read_input(path: &Path) -> Result<Vec<u8>, AppError> {
    let path = validate_file_path(path)?;
    validate_file_size(&path, MAX_INPUT_FILE_SIZE)?;
    std::fs::read(&path)
        .map_err(|e| AppError::Io(format!("Cannot read '{}': {e}", path.display())))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let path = validate_output_path(path)?;
    std::fs::write(&path, bytes)
        .map_err(|e| AppError::Io(format!("Cannot write '{}': {e}", path.display())))
}

/// Load the editor configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<EditorConfig, AppError> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let bytes = read_input(path)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| AppError::InvalidInput(format!("Config is not UTF-8: {e}")))?;
    Ok(toml::from_str(&text)?)
}

/// Load a graph from a binary snapshot or a JSON document.
pub fn load_graph(path: &Path) -> Result<RegionGraph, AppError> {
    let bytes = read_input(path)?;
    if bytes.starts_with(MAGIC_BYTES) {
        return Ok(graph_from_bytes(&bytes)?);
    }
    let serializable: SerializableGraph = serde_json::from_slice(&bytes)?;
    let graph = RegionGraph::try_from(serializable)?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph loaded"
    );
    Ok(graph)
}

/// Write a graph; `.prag` paths get a binary snapshot, anything else JSON.
pub fn save_graph(graph: &RegionGraph, path: &Path) -> Result<(), AppError> {
    let binary = path
        .extension()
        .is_some_and(|ext| ext == SNAPSHOT_EXTENSION);
    let bytes = if binary {
        graph_to_bytes(graph)?
    } else {
        serde_json::to_vec_pretty(&SerializableGraph::from(graph))?
    };
    write_output(path, &bytes)
}

pub fn load_state(path: &Path) -> Result<SchedulerState, AppError> {
    let bytes = read_input(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn save_state(state: &SchedulerState, path: &Path) -> Result<(), AppError> {
    write_output(path, &serde_json::to_vec_pretty(state)?)
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// EDITOR SETUP
// =============================================================================

/// Fully resolved mode selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeOptions {
    pub mode: ReviewMode,
    pub ignore_size: Option<f64>,
    pub depth: u32,
    pub range: EdgeRange,
}

fn apply_mode(editor: &mut EdgeEditor, options: &ModeOptions) {
    match options.mode {
        ReviewMode::Body => editor.set_body_mode(
            options.ignore_size.unwrap_or(DEFAULT_BODY_IGNORE),
            options.depth,
        ),
        ReviewMode::Synapse => {
            editor.set_synapse_mode(options.ignore_size.unwrap_or(DEFAULT_SYNAPSE_IGNORE));
        }
        ReviewMode::Orphan => {
            editor.set_orphan_mode(options.ignore_size.unwrap_or(DEFAULT_BODY_IGNORE));
        }
        ReviewMode::Edge => editor.set_edge_mode(
            options.range.min,
            options.range.max,
            options.range.start,
        ),
    }
}

/// Build an editor from a state document, a mode selection, or both.
///
/// A state document restores the session; an explicit mode is applied on
/// top of it, keeping the document's orphan and synapse annotations.
pub fn open_editor(
    graph: RegionGraph,
    state: Option<&SchedulerState>,
    options: Option<&ModeOptions>,
    config: EditorConfig,
) -> Result<EdgeEditor, AppError> {
    let mut editor = match state {
        Some(state) => EdgeEditor::from_state(graph, state, config)?,
        None => EdgeEditor::new(graph, config),
    };
    match (state, options) {
        (_, Some(options)) => apply_mode(&mut editor, options),
        (Some(_), None) => {}
        (None, None) => {
            return Err(AppError::InvalidInput(
                "either --state or --mode is required".to_string(),
            ));
        }
    }
    Ok(editor)
}

// =============================================================================
// STATS COMMAND
// =============================================================================

/// Show graph statistics.
pub fn cmd_stats(graph_path: &Path, json_mode: bool) -> Result<(), AppError> {
    let graph = load_graph(graph_path)?;
    let boundary = graph.nodes().filter(|n| n.boundary).count();
    let orphans = graph.nodes().filter(|n| n.props.is_orphan()).count();
    let resolved = graph.edges().filter(|e| e.is_resolved()).count();

    if json_mode {
        print_json(&serde_json::json!({
            "graph": graph_path.to_string_lossy(),
            "node_count": graph.node_count(),
            "edge_count": graph.edge_count(),
            "total_size": graph.total_size(),
            "boundary_nodes": boundary,
            "orphan_nodes": orphans,
            "resolved_edges": resolved,
        }));
        return Ok(());
    }

    println!("Region Graph Statistics");
    println!("=======================");
    println!("Graph:          {}", graph_path.display());
    println!();
    println!("Nodes:          {}", graph.node_count());
    println!("Edges:          {}", graph.edge_count());
    println!("Total Size:     {}", graph.total_size());
    println!("Boundary Nodes: {boundary}");
    println!("Orphan Nodes:   {orphans}");
    println!("Resolved Edges: {resolved}");
    Ok(())
}

// =============================================================================
// INCLUSIONS COMMAND
// =============================================================================

/// Remove inclusions and write the contracted graph.
pub fn cmd_inclusions(graph_path: &Path, output: &Path, json_mode: bool) -> Result<(), AppError> {
    let mut graph = load_graph(graph_path)?;
    let before = graph.node_count();
    let removed = InclusionRemover::remove_inclusions(&mut graph)?;
    save_graph(&graph, output)?;

    if json_mode {
        print_json(&serde_json::json!({
            "nodes_before": before,
            "nodes_after": graph.node_count(),
            "removed": removed,
            "output": output.to_string_lossy(),
        }));
    } else {
        println!("Removed {removed} enclosed regions ({before} -> {} nodes)", graph.node_count());
        println!("Written to {}", output.display());
    }
    Ok(())
}

// =============================================================================
// ESTIMATE COMMAND
// =============================================================================

/// Simulate the session with a weight-threshold oracle.
pub fn cmd_estimate(
    graph_path: &Path,
    state_path: Option<&Path>,
    options: Option<ModeOptions>,
    merge_below: f64,
    config: EditorConfig,
    json_mode: bool,
) -> Result<(), AppError> {
    let graph = load_graph(graph_path)?;
    let state = state_path.map(load_state).transpose()?;
    let mut editor = open_editor(graph, state.as_ref(), options.as_ref(), config)?;

    let estimate = editor.estimate_work(|graph, pair| {
        graph
            .edge(pair.0, pair.1)
            .is_some_and(|edge| edge.weight < merge_below)
    })?;
    let mode = editor.mode().map_or("none", ReviewMode::as_str);

    if json_mode {
        print_json(&serde_json::json!({
            "mode": mode,
            "merge_below": merge_below,
            "estimate": estimate,
            "processed": editor.processed().total,
        }));
    } else {
        println!("Mode:      {mode}");
        println!("Oracle:    merge below {merge_below}");
        println!("Estimate:  {estimate} decisions");
    }
    Ok(())
}

// =============================================================================
// QA COMMAND
// =============================================================================

/// List orphan bodies that should have been attached.
pub fn cmd_qa(
    graph_path: &Path,
    state_path: Option<&Path>,
    threshold: u64,
    config: EditorConfig,
    json_mode: bool,
) -> Result<(), AppError> {
    let graph = load_graph(graph_path)?;
    let editor = match state_path {
        Some(path) => EdgeEditor::from_state(graph, &load_state(path)?, config)?,
        None => EdgeEditor::new(graph, config),
    };
    let violators: Vec<u64> = editor
        .get_qa_violators(threshold)
        .into_iter()
        .map(|id| id.0)
        .collect();

    if json_mode {
        print_json(&serde_json::json!({
            "threshold": threshold,
            "violators": violators,
        }));
        return Ok(());
    }

    if violators.is_empty() {
        println!("No QA violators at threshold {threshold}");
    } else {
        println!("{} QA violators at threshold {threshold}:", violators.len());
        for id in &violators {
            println!("  {id}");
        }
    }
    Ok(())
}

// =============================================================================
// INIT-STATE COMMAND
// =============================================================================

/// Configure a mode on a fresh graph and write the state document.
pub fn cmd_init_state(
    graph_path: &Path,
    options: ModeOptions,
    output: &Path,
    config: EditorConfig,
    json_mode: bool,
) -> Result<(), AppError> {
    let graph = load_graph(graph_path)?;
    let editor = open_editor(graph, None, Some(&options), config)?;
    let state = editor.export_state();
    save_state(&state, output)?;

    let staged = editor.staged().map(|pair| [pair.0.0, pair.1.0]);
    if json_mode {
        print_json(&serde_json::json!({
            "mode": options.mode.as_str(),
            "remaining": editor.get_num_remaining(),
            "staged": staged,
            "location": editor.staged_location(),
            "output": output.to_string_lossy(),
        }));
    } else {
        println!("Mode:       {}", options.mode);
        println!("Remaining:  {}", editor.get_num_remaining());
        match editor.staged() {
            Some(pair) => println!("First edge: {pair}"),
            None => println!("First edge: none (finished)"),
        }
        if let Some(location) = editor.staged_location() {
            println!("Location:   ({}, {}, {})", location.x, location.y, location.z);
        }
        println!("Written to {}", output.display());
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_without_parent_resolves_to_cwd() {
        let resolved = validate_output_path(Path::new("out.json")).expect("resolve");
        assert_eq!(resolved.file_name().and_then(|f| f.to_str()), Some("out.json"));
    }

    #[test]
    fn missing_input_is_io_error() {
        let result = load_graph(Path::new("/nonexistent/graph.json"));
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn no_config_means_defaults() {
        assert_eq!(load_config(None).expect("config"), EditorConfig::default());
    }
}
