use std::{
    fs::File,
    io::{self, BufWriter, StdoutLock, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use stargrid_analysis::{classify::ClassificationThresholds, game::GameRecord, record::GameLog};

use crate::schema::thresholds::ThresholdsFile;

/// Destination of a JSON document: stdout, or a file when `--output` is given
#[derive(Debug)]
pub enum Output {
    Stdout(StdoutLock<'static>),
    File { writer: BufWriter<File>, path: PathBuf },
}

impl Output {
    /// Write `value` as pretty JSON to `path`, or to stdout when `path` is
    /// `None`
    pub fn save_json<T>(value: &T, path: Option<&Path>) -> anyhow::Result<()>
    where
        T: serde::Serialize + ?Sized,
    {
        let mut output = match path {
            Some(path) => Output::create(path)?,
            None => Output::Stdout(io::stdout().lock()),
        };
        output.write_json(value)?;
        if let Output::File { path, .. } = &output {
            eprintln!("Wrote {}", path.display());
        }
        Ok(())
    }

    fn create(path: &Path) -> anyhow::Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
        })
    }

    fn target(&self) -> String {
        match self {
            Output::Stdout(_) => "stdout".to_owned(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    fn write_json<T>(&mut self, value: &T) -> anyhow::Result<()>
    where
        T: serde::Serialize + ?Sized,
    {
        let target = self.target();
        let writer: &mut dyn Write = match self {
            Output::Stdout(writer) => writer,
            Output::File { writer, .. } => writer,
        };
        serde_json::to_writer_pretty(&mut *writer, value)
            .with_context(|| format!("Failed to write JSON to {target}"))?;
        writeln!(writer).with_context(|| format!("Failed to write JSON to {target}"))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush output to {target}"))
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Read game logs from a JSON file and build the game records
///
/// # Arguments
///
/// * `path` - Path to a JSON array of game logs
///
/// # Errors
///
/// Returns error if the file cannot be opened or parsed, or if any game log
/// is malformed
pub fn read_games_file<P>(path: P) -> anyhow::Result<Vec<GameRecord>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let logs: Vec<GameLog> = read_json_file("games", path)?;
    let games = logs
        .iter()
        .map(GameRecord::from_log)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Malformed game log in {}", path.display()))?;
    eprintln!("Loaded {} games from {}", games.len(), path.display());
    Ok(games)
}

/// Read classification thresholds from a JSON file
pub fn read_thresholds_file<P>(path: P) -> anyhow::Result<ClassificationThresholds>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file: ThresholdsFile = read_json_file("thresholds", path)?;
    let thresholds = file
        .to_thresholds()
        .with_context(|| format!("Invalid thresholds in {}", path.display()))?;
    eprintln!(
        "Thresholds: def_neu = {:.4}, neu_col = {:.4} (computed at {})",
        thresholds.def_neu(),
        thresholds.neu_col(),
        file.computed_at
    );
    Ok(thresholds)
}
