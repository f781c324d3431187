//! Hand-rolled argument parsing for `repogallery_cli`.

use std::path::PathBuf;

use crate::config::Category;
use crate::error::AppError;

/// Fields given on `settings save`; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AboutInput {
    Text(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SettingsShow,
    SettingsSave(SettingsPatch),
    SettingsClear,
    Upload { category: Category, file: Option<PathBuf>, description: String, assume_yes: bool },
    List { category: Option<Category> },
    AboutShow,
    AboutPublish(AboutInput),
    Help,
}

impl Command {
    /// Commands that write to the store.
    pub fn needs_admin(&self) -> bool {
        matches!(self, Command::Upload { .. } | Command::AboutPublish(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub settings_path: Option<PathBuf>,
    pub command: Command,
}

fn usage(msg: impl Into<String>) -> AppError {
    AppError::user("usage".to_string(), msg.into())
}

fn take_value(args: &[String], i: usize, flag: &str) -> Result<String, AppError> {
    args.get(i + 1).cloned().ok_or_else(|| usage(format!("{} requires a value", flag)))
}

fn category(s: &str) -> Result<Category, AppError> {
    s.parse::<Category>().map_err(usage)
}

/// Parse arguments (without the program name).
pub fn parse_args(args: &[String]) -> Result<Invocation, AppError> {
    let mut settings_path: Option<PathBuf> = None;
    let mut rest: Vec<String> = Vec::new();

    // global flags may appear anywhere
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--settings" => {
                settings_path = Some(PathBuf::from(take_value(args, i, "--settings")?));
                i += 2;
            }
            "-h" | "--help" => {
                return Ok(Invocation { settings_path, command: Command::Help });
            }
            _ => {
                rest.push(args[i].clone());
                i += 1;
            }
        }
    }

    let command = match rest.first().map(String::as_str) {
        None | Some("help") => Command::Help,
        Some("settings") => parse_settings(&rest[1..])?,
        Some("upload") => parse_upload(&rest[1..])?,
        Some("list") => match rest.get(1) {
            None => Command::List { category: None },
            Some(c) if rest.len() == 2 => Command::List { category: Some(category(c)?) },
            Some(_) => return Err(usage("list takes at most one category")),
        },
        Some("about") => parse_about(&rest[1..])?,
        Some(other) => return Err(usage(format!("unknown command '{}'", other))),
    };
    Ok(Invocation { settings_path, command })
}

fn parse_settings(args: &[String]) -> Result<Command, AppError> {
    match args.first().map(String::as_str) {
        Some("show") if args.len() == 1 => Ok(Command::SettingsShow),
        Some("clear") if args.len() == 1 => Ok(Command::SettingsClear),
        Some("save") => {
            let mut patch = SettingsPatch::default();
            let mut i = 1;
            while i < args.len() {
                let value = take_value(args, i, &args[i])?;
                match args[i].as_str() {
                    "--owner" => patch.owner = Some(value),
                    "--repo" => patch.repo = Some(value),
                    "--branch" => patch.branch = Some(value),
                    "--token" => patch.token = Some(value),
                    unk => return Err(usage(format!("unrecognized settings flag: {}", unk))),
                }
                i += 2;
            }
            Ok(Command::SettingsSave(patch))
        }
        _ => Err(usage("expected: settings show | settings save [flags] | settings clear")),
    }
}

fn parse_upload(args: &[String]) -> Result<Command, AppError> {
    let mut category_arg: Option<Category> = None;
    let mut file: Option<PathBuf> = None;
    let mut description = String::new();
    let mut assume_yes = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--desc" | "-d" => {
                description = take_value(args, i, "--desc")?;
                i += 2;
                continue;
            }
            "--yes" | "-y" => assume_yes = true,
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(usage(format!("unrecognized upload flag: {}", flag)));
            }
            positional => {
                if category_arg.is_none() {
                    category_arg = Some(category(positional)?);
                } else if file.is_none() {
                    file = Some(PathBuf::from(positional));
                } else {
                    return Err(usage(format!("unexpected argument: {}", positional)));
                }
            }
        }
        i += 1;
    }

    let category = category_arg.ok_or_else(|| usage("upload requires a category (all | toonboom)"))?;
    Ok(Command::Upload { category, file, description, assume_yes })
}

fn parse_about(args: &[String]) -> Result<Command, AppError> {
    match args.first().map(String::as_str) {
        Some("show") if args.len() == 1 => Ok(Command::AboutShow),
        Some("publish") => match args.get(1).map(String::as_str) {
            Some("--file") => Ok(Command::AboutPublish(AboutInput::File(PathBuf::from(take_value(args, 1, "--file")?)))),
            Some(_) => Ok(Command::AboutPublish(AboutInput::Text(args[1..].join(" ")))),
            None => Err(usage("about publish needs text or --file <path>")),
        },
        _ => Err(usage("expected: about show | about publish <text> | about publish --file <path>")),
    }
}
