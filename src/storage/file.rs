//! File-backed journal storage.
//!
//! Layout:
//!   data_dir/YYYY-MM-DD.json        one document per day
//!   summary_dir/YYYY-MM-DD.md       daily summaries
//!   summary_dir/week-YYYY-MM-DD.md  weekly summaries, named by week end

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tokio::fs;
use tracing::debug;

use super::{DailyData, Result, Storage, StorageError, WorkEntry};

/// Journal storage over plain files.
#[derive(Clone)]
pub struct FileStorage {
    data_dir: PathBuf,
    summary_dir: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at the given directories. Directories are
    /// created lazily on first write.
    pub fn new(data_dir: &Path, summary_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            summary_dir: summary_dir.to_path_buf(),
        }
    }

    fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir.join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    fn summary_path(&self, date: NaiveDate) -> PathBuf {
        self.summary_dir
            .join(format!("{}.md", date.format("%Y-%m-%d")))
    }

    fn weekly_summary_path(&self, week_end: NaiveDate) -> PathBuf {
        self.summary_dir
            .join(format!("week-{}.md", week_end.format("%Y-%m-%d")))
    }

    async fn read_day(&self, date: NaiveDate) -> Result<DailyData> {
        let path = self.day_path(date);
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(DailyData::empty(date));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&data).map_err(|e| StorageError::CorruptDay(date, e.to_string()))
    }

    /// Persist a day document atomically via temp file + rename.
    async fn write_day(&self, day: &DailyData) -> Result<()> {
        let content = serde_json::to_vec_pretty(day)
            .map_err(|e| StorageError::Serialize(e.to_string()))?;
        fs::create_dir_all(&self.data_dir).await?;

        let path = self.day_path(day.date);
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    async fn write_markdown(&self, path: &Path, content: &str) -> Result<()> {
        fs::create_dir_all(&self.summary_dir).await?;
        let temp_path = path.with_extension("md.tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, path).await?;
        Ok(())
    }

    /// Dates of all day documents, ascending. Non-date file names are
    /// ignored.
    async fn stored_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut entries = match fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut dates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(stem) = Path::new(&name)
                .file_stem()
                .and_then(|s| s.to_str())
            else {
                continue;
            };
            if Path::new(&name).extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if let Ok(date) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }
}

#[async_trait::async_trait]
impl Storage for FileStorage {
    async fn save_entry(&self, entry: WorkEntry) -> Result<()> {
        let date = entry.timestamp.date_naive();
        let mut day = self.read_day(date).await?;
        day.entries.push(entry);
        self.write_day(&day).await?;
        debug!(date = %date, entries = day.entries.len(), "Entry saved");
        Ok(())
    }

    async fn daily_data(&self, date: NaiveDate) -> Result<DailyData> {
        self.read_day(date).await
    }

    async fn last_entry(&self) -> Result<Option<WorkEntry>> {
        for date in self.stored_dates().await?.into_iter().rev() {
            let day = self.read_day(date).await?;
            if let Some(entry) = day.entries.last() {
                return Ok(Some(entry.clone()));
            }
        }
        Ok(None)
    }

    async fn ungenerated_dates(&self, before: NaiveDate) -> Result<Vec<NaiveDate>> {
        let mut pending = Vec::new();
        for date in self.stored_dates().await? {
            if date >= before {
                continue;
            }
            let day = self.read_day(date).await?;
            if !day.entries.is_empty() && !day.summary_generated {
                pending.push(date);
            }
        }
        Ok(pending)
    }

    async fn mark_summary_generated(&self, date: NaiveDate) -> Result<()> {
        let mut day = self.read_day(date).await?;
        day.summary_generated = true;
        self.write_day(&day).await
    }

    async fn save_summary(&self, date: NaiveDate, content: &str) -> Result<()> {
        self.write_markdown(&self.summary_path(date), content).await
    }

    async fn summary(&self, date: NaiveDate) -> Result<Option<String>> {
        match fs::read_to_string(self.summary_path(date)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn daily_summaries_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, String)>> {
        let mut summaries = Vec::new();
        let mut date = start;
        while date <= end {
            if let Some(content) = self.summary(date).await? {
                summaries.push((date, content));
            }
            match date.succ_opt() {
                Some(d) => date = d,
                None => break,
            }
        }
        Ok(summaries)
    }

    async fn save_weekly_summary(&self, week_end: NaiveDate, content: &str) -> Result<()> {
        self.write_markdown(&self.weekly_summary_path(week_end), content)
            .await
    }
}
