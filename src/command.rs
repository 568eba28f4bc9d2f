//! Command surface for front ends such as an interactive shell.
//! Each command maps to one file system operation and yields a typed outcome
//! whose `Display` is the message to show the user.

use core::fmt;

use crate::{EntryInfo, FileSystem, ImageDevice, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateFile { name: String, data: Vec<u8> },
    DeleteFile { name: String },
    ReadFile { name: String },
    WriteFile { name: String, data: Vec<u8> },
    TruncateFile { name: String, new_size: u64 },
    CreateDirectory { name: String },
    DeleteDirectory { name: String },
    ReadBlock { index: u32 },
    WriteBlock { index: u32, data: Vec<u8> },
    ListFiles,
    ListAll,
    ListFilesAndDirectories,
    Format,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    FileCreated { name: String, slot: usize },
    FileDeleted { name: String },
    FileRead { name: String, data: Vec<u8> },
    FileWritten { name: String },
    FileTruncated { name: String, new_size: u64 },
    DirectoryCreated { name: String, slot: usize },
    DirectoryDeleted { name: String },
    BlockRead { index: u32, data: Vec<u8> },
    BlockWritten { index: u32 },
    Files(Vec<EntryInfo>),
    Entries(Vec<EntryInfo>),
    FilesAndDirectories(Vec<String>),
    Formatted,
}

impl<D: ImageDevice> FileSystem<D> {
    pub fn execute(&mut self, command: Command) -> Result<Outcome> {
        let outcome = match command {
            Command::CreateFile { name, data } => {
                let slot = self.create_file(&name, &data)?;
                Outcome::FileCreated { name, slot }
            }
            Command::DeleteFile { name } => {
                self.delete_file(&name)?;
                Outcome::FileDeleted { name }
            }
            Command::ReadFile { name } => {
                let data = self.read_file(&name)?;
                Outcome::FileRead { name, data }
            }
            Command::WriteFile { name, data } => {
                self.write_file(&name, &data)?;
                Outcome::FileWritten { name }
            }
            Command::TruncateFile { name, new_size } => {
                self.truncate_file(&name, new_size)?;
                Outcome::FileTruncated { name, new_size }
            }
            Command::CreateDirectory { name } => {
                let slot = self.create_directory(&name)?;
                Outcome::DirectoryCreated { name, slot }
            }
            Command::DeleteDirectory { name } => {
                self.delete_directory(&name)?;
                Outcome::DirectoryDeleted { name }
            }
            Command::ReadBlock { index } => {
                let data = self.read_block(index)?;
                Outcome::BlockRead { index, data }
            }
            Command::WriteBlock { index, data } => {
                self.write_block(index, &data)?;
                Outcome::BlockWritten { index }
            }
            Command::ListFiles => Outcome::Files(self.list_files()),
            Command::ListAll => Outcome::Entries(self.list_all()),
            Command::ListFilesAndDirectories => {
                Outcome::FilesAndDirectories(self.list_files_and_directories())
            }
            Command::Format => {
                self.format()?;
                Outcome::Formatted
            }
        };
        Ok(outcome)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::FileCreated { name, .. } => write!(f, "File '{}' created successfully.", name),
            Outcome::FileDeleted { name } => write!(f, "File '{}' deleted successfully.", name),
            Outcome::FileRead { data, .. } => write!(f, "{}", String::from_utf8_lossy(data)),
            Outcome::FileWritten { name } => write!(f, "Data written to file '{}'.", name),
            Outcome::FileTruncated { name, new_size } => {
                write!(f, "File '{}' truncated to {} bytes.", name, new_size)
            }
            Outcome::DirectoryCreated { name, .. } => {
                write!(f, "Directory '{}' created successfully.", name)
            }
            Outcome::DirectoryDeleted { name } => {
                write!(f, "Directory '{}' deleted successfully.", name)
            }
            Outcome::BlockRead { index, data } => {
                // Raw blocks are NUL padded; show the text up to the first NUL.
                let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
                write!(f, "Block {}: {}", index, String::from_utf8_lossy(&data[..end]))
            }
            Outcome::BlockWritten { index } => write!(f, "Block {} written.", index),
            Outcome::Files(files) => {
                write!(f, "Files in the directory:")?;
                for file in files {
                    write!(f, "\n{}", file.name)?;
                }
                Ok(())
            }
            Outcome::Entries(entries) => {
                let lines: Vec<String> = entries.iter().map(ToString::to_string).collect();
                write!(f, "{}", lines.join("\n"))
            }
            Outcome::FilesAndDirectories(lines) => {
                write!(f, "Files and Directories:")?;
                for line in lines {
                    write!(f, "\n{}", line)?;
                }
                Ok(())
            }
            Outcome::Formatted => write!(f, "Partition formatted."),
        }
    }
}
