use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint {path} is missing tensors {missing:?}")]
    MissingTensors { path: PathBuf, missing: Vec<String> },
    #[error("checkpoint {path} is not a safetensors file: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("variable map lock was poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tensors_names_the_file() {
        let err = CheckpointError::MissingTensors {
            path: PathBuf::from("models/0th_model_a.safetensors"),
            missing: vec!["a_net0.weight".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("0th_model_a.safetensors"));
        assert!(msg.contains("a_net0.weight"));
    }
}
