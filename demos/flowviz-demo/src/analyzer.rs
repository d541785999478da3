use std::{thread, time::Duration};

use flowviz::{AnalysisError, AnalysisRequest, Responder};
use serde_json::{json, Value};

const LATENCY: Duration = Duration::from_millis(300);

/// Stand-in for a remote analysis service: turns every non-empty source line into a flow
/// step and answers from a worker thread after a short delay.
pub fn line_flow(request: AnalysisRequest, responder: Responder<String>) {
    thread::spawn(move || {
        thread::sleep(LATENCY);
        responder.respond(flow_json(&request.content));
    });
}

fn flow_json(source: &str) -> Result<String, AnalysisError> {
    let lines: Vec<&str> = source
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(AnalysisError::new("nothing to analyze"));
    }

    let mut nodes = vec![json!({ "id": "start", "label": "Start", "type": "start" })];
    let mut links = Vec::new();
    let mut prev = "start".to_string();
    for (i, line) in lines.iter().enumerate() {
        let id = format!("n{i}");
        nodes.push(json!({
            "id": id,
            "label": line,
            "type": kind_of(line),
            "important": line.starts_with("return"),
        }));
        links.push(json!({ "source": prev, "target": id }));
        prev = id;
    }
    nodes.push(json!({ "id": "end", "label": "End", "type": "end" }));
    links.push(json!({ "source": prev, "target": "end", "label": "done" }));

    let doc: Value = json!({ "nodes": nodes, "links": links });
    serde_json::to_string(&doc).map_err(|e| AnalysisError::new(e.to_string()))
}

fn kind_of(line: &str) -> &'static str {
    if line.starts_with("if") {
        "condition"
    } else if line.starts_with("while") || line.starts_with("for") {
        "loop"
    } else if line.starts_with("def") || line.contains('(') {
        "function"
    } else {
        "process"
    }
}
