use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::Error;

/// Where in the analyzed source a step happens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLocation {
    pub line: Option<u32>,
    pub code: String,
}

/// One recorded execution step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Position in the trace, contiguous from zero.
    pub index: usize,
    pub location: StepLocation,
    /// Plain language explanation of what the step does.
    pub narrative: String,
    /// Variable name to value after the step, in declaration order.
    pub variables: Map<String, Value>,
    /// Program output produced by this step.
    pub output: Option<String>,
}

/// Step as produced by the trace collaborator. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStep {
    #[serde(default)]
    pub line_number: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub explanation: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: Map<String, Value>,
    #[serde(default)]
    pub output: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
struct TraceInput {
    steps: Vec<RawStep>,
}

/// Ordered, immutable list of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    steps: Vec<TraceStep>,
}

impl Trace {
    /// Assigns contiguous indices in input order.
    pub fn from_raw(raw: Vec<RawStep>) -> Self {
        let steps = raw
            .into_iter()
            .enumerate()
            .map(|(index, r)| TraceStep {
                index,
                location: StepLocation {
                    line: r.line_number,
                    code: r.code,
                },
                narrative: r.explanation,
                variables: r.variables,
                output: r.output.filter(|o| !o.is_empty()),
            })
            .collect();
        Self { steps }
    }

    /// Decodes `{ "steps": [...] }`. A missing or mistyped `steps` array is
    /// [`Error::MalformedInput`].
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let input: TraceInput = serde_json::from_str(json)?;
        log::debug!("decoded trace with {} steps", input.steps.len());
        Ok(Self::from_raw(input.steps))
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&TraceStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_decode_full_step() {
        let trace = Trace::from_json(
            r#"{"steps":[{"lineNumber":3,"code":"x = 1","explanation":"assign",
                "variables":{"x":1,"a":[1,2]},"output":"done"}]}"#,
        )
        .unwrap();
        let step = &trace.steps()[0];
        assert_eq!(step.index, 0);
        assert_eq!(step.location.line, Some(3));
        assert_eq!(step.location.code, "x = 1");
        assert_eq!(step.narrative, "assign");
        assert_eq!(step.output.as_deref(), Some("done"));
        let names: Vec<&String> = step.variables.keys().collect();
        assert_eq!(names, ["x", "a"]);
    }

    #[test]
    fn test_missing_fields_tolerated() {
        let trace =
            Trace::from_json(r#"{"steps":[{},{"explanation":null,"variables":null,"output":""}]}"#)
                .unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.steps()[1].index, 1);
        assert_eq!(trace.steps()[1].narrative, "");
        assert!(trace.steps()[1].variables.is_empty());
        assert_eq!(trace.steps()[1].output, None);
        assert_eq!(trace.steps()[0].location, StepLocation::default());
    }

    #[test]
    fn test_steps_must_be_array() {
        for json in [r#"{}"#, r#"{"steps":{}}"#, r#"{"steps":3}"#, "[]"] {
            let err = Trace::from_json(json).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedInput, "{json}");
        }
    }
}
