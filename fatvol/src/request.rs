//! Request dispatch: one typed request in, one typed response out.
//!
//! This is the surface a command shell drives. Every failure comes back as an
//! `FsError`; callers that need a wire code use `FsError::status()`.

use log::debug;
use volume_api_types::{ListEntry, VolumeOp, VolumeStatus};

use crate::check::CheckReport;
use crate::dir::DirEntry;
use crate::disk::Disk;
use crate::error::Result;
use crate::volume::Volume;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Format,
    Reload,
    MakeDirectory { path: Vec<String> },
    CreateFile    { path: Vec<String> },
    Remove        { path: Vec<String> },
    List          { path: Vec<String> },
    OverwriteFile { path: Vec<String>, data: Vec<u8> },
    ReadFile      { path: Vec<String> },
    AppendFile    { path: Vec<String>, data: Vec<u8> },
    Stat          { path: Vec<String> },
    Check,
}

impl Request {
    pub fn op(&self) -> VolumeOp {
        match self {
            Request::Format             => VolumeOp::Format,
            Request::Reload             => VolumeOp::Reload,
            Request::MakeDirectory { .. } => VolumeOp::MakeDirectory,
            Request::CreateFile { .. }  => VolumeOp::CreateFile,
            Request::Remove { .. }      => VolumeOp::Remove,
            Request::List { .. }        => VolumeOp::List,
            Request::OverwriteFile { .. } => VolumeOp::OverwriteFile,
            Request::ReadFile { .. }    => VolumeOp::ReadFile,
            Request::AppendFile { .. }  => VolumeOp::AppendFile,
            Request::Stat { .. }        => VolumeOp::Stat,
            Request::Check              => VolumeOp::Check,
        }
    }

    /// Build a path-carrying request from a `/`-separated path string.
    pub fn with_path(op: VolumeOp, path: &str, data: Vec<u8>) -> Option<Self> {
        let path: Vec<String> = crate::volume::components(path).into_iter().map(String::from).collect();
        Some(match op {
            VolumeOp::MakeDirectory => Request::MakeDirectory { path },
            VolumeOp::CreateFile    => Request::CreateFile { path },
            VolumeOp::Remove        => Request::Remove { path },
            VolumeOp::List          => Request::List { path },
            VolumeOp::OverwriteFile => Request::OverwriteFile { path, data },
            VolumeOp::ReadFile      => Request::ReadFile { path },
            VolumeOp::AppendFile    => Request::AppendFile { path, data },
            VolumeOp::Stat          => Request::Stat { path },
            VolumeOp::Format | VolumeOp::Reload | VolumeOp::Check => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Done,
    Created(DirEntry),
    Listing(Vec<ListEntry>),
    Content(Vec<u8>),
    /// New declared size after a content write.
    Size(u32),
    Entry(DirEntry),
    Report(CheckReport),
}

impl Response {
    /// A response only exists for a successful request.
    pub fn status(&self) -> VolumeStatus { VolumeStatus::Ok }
}

fn segments(path: &[String]) -> Vec<&str> {
    path.iter().map(String::as_str).collect()
}

pub fn execute<D: Disk>(volume: &mut Volume<D>, request: Request) -> Result<Response> {
    debug!("executing {:?}", request.op());
    Ok(match request {
        Request::Format => {
            volume.format()?;
            Response::Done
        }
        Request::Reload => {
            volume.reload()?;
            Response::Done
        }
        Request::MakeDirectory { path } => Response::Created(volume.make_directory(&segments(&path))?),
        Request::CreateFile { path }    => Response::Created(volume.create_file(&segments(&path))?),
        Request::Remove { path } => {
            volume.remove(&segments(&path))?;
            Response::Done
        }
        Request::List { path } => Response::Listing(volume.list(&segments(&path))?.to_list_entries()),
        Request::OverwriteFile { path, data } => {
            Response::Size(volume.overwrite_file(&segments(&path), &data)?)
        }
        Request::ReadFile { path } => Response::Content(volume.read_file(&segments(&path))?),
        Request::AppendFile { path, data } => {
            Response::Size(volume.append_file(&segments(&path), &data)?)
        }
        Request::Stat { path } => Response::Entry(volume.stat(&segments(&path))?),
        Request::Check => Response::Report(volume.check()?),
    })
}
