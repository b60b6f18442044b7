use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpisodeRecord {
    pub episode: usize,
    pub total_reward: f32,
    pub avg_reward: f32,
    pub len: usize,
}

impl EpisodeRecord {
    pub fn new(episode: usize, total_reward: f32, len: usize) -> Self {
        let avg_reward = if len == 0 {
            0.
        } else {
            total_reward / len as f32
        };
        Self {
            episode,
            total_reward,
            avg_reward,
            len,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iter: usize,
    pub sample_num: usize,
    pub episodes: usize,
    pub avg_train_reward: f32,
    pub avg_train_return: f32,
    pub avg_steps: f32,
    pub policy_loss: f32,
    pub value_loss: f32,
    pub entropy: f32,
}

/// Destination of training metrics.
pub trait MetricsSink {
    fn log_episode(&mut self, record: &EpisodeRecord) -> Result<()>;

    fn log_iteration(&mut self, record: &IterationRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn log_episode(&mut self, _record: &EpisodeRecord) -> Result<()> {
        Ok(())
    }

    fn log_iteration(&mut self, _record: &IterationRecord) -> Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum MetricsLine<'a> {
    Episode(&'a EpisodeRecord),
    Iteration(&'a IterationRecord),
}

/// Appends one JSON object per record to a file.
pub struct JsonlMetrics {
    writer: BufWriter<File>,
}

impl JsonlMetrics {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log dir {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("creating metrics file {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn write_line(&mut self, line: &MetricsLine) -> Result<()> {
        serde_json::to_writer(&mut self.writer, line)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl MetricsSink for JsonlMetrics {
    fn log_episode(&mut self, record: &EpisodeRecord) -> Result<()> {
        self.write_line(&MetricsLine::Episode(record))
    }

    fn log_iteration(&mut self, record: &IterationRecord) -> Result<()> {
        self.write_line(&MetricsLine::Iteration(record))?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_record_averages_per_step() {
        let record = EpisodeRecord::new(3, 10., 4);
        assert_eq!(record.avg_reward, 2.5);
        assert_eq!(EpisodeRecord::new(0, 1., 0).avg_reward, 0.);
    }

    #[test]
    fn jsonl_metrics_tags_each_line() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("logs").join("metrics.jsonl");
        let mut sink = JsonlMetrics::create(&path)?;
        sink.log_episode(&EpisodeRecord::new(1, 4., 2))?;
        sink.log_iteration(&IterationRecord {
            iter: 0,
            sample_num: 2,
            episodes: 1,
            avg_train_reward: 2.,
            avg_train_return: 4.,
            avg_steps: 2.,
            policy_loss: 0.1,
            value_loss: 0.2,
            entropy: 1.4,
        })?;
        sink.flush()?;
        let content = fs::read_to_string(&path)?;
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["kind"], "episode");
        assert_eq!(lines[0]["len"], 2);
        assert_eq!(lines[1]["kind"], "iteration");
        assert_eq!(lines[1]["sample_num"], 2);
        Ok(())
    }
}
