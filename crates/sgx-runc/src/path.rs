use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// PathResolve allows to resolve an executable the way `which` does.
pub trait PathResolve {
    /// Resolve the path of a file given a set of directories, and return an
    /// iterator over all candidates that are executable regular files.
    /// Directories are canonicalized but the file name is kept, so a symlinked
    /// binary is returned under the name it was found by.
    /// A name containing a separator is resolved against the working
    /// directory only, the directories are ignored.
    fn resolve_in_dirs(
        &self,
        dirs: impl IntoIterator<Item = impl AsRef<Path>>,
    ) -> impl Iterator<Item = PathBuf>;
}

/// Gets the content of the `PATH` environment variable as an iterator over its components
pub fn paths() -> impl Iterator<Item = PathBuf> {
    std::env::var_os("PATH")
        .as_ref()
        .map(std::env::split_paths)
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .into_iter()
}

impl<T: AsRef<Path>> PathResolve for T {
    fn resolve_in_dirs(
        &self,
        dirs: impl IntoIterator<Item = impl AsRef<Path>>,
    ) -> impl Iterator<Item = PathBuf> {
        let cwd = std::env::current_dir().ok();

        let has_separator = self.as_ref().components().count() > 1;

        // only one concrete iterator type can be returned, hence the pair of options
        let (first, second) = if has_separator {
            (cwd, None)
        } else {
            let dirs = dirs.into_iter().filter_map(move |p| {
                let path = cwd.as_ref()?.join(p.as_ref()).canonicalize().ok()?;
                path.is_dir().then_some(path)
            });
            (None, Some(dirs))
        };

        let file = self.as_ref().to_owned();
        first
            .into_iter()
            .chain(second.into_iter().flatten())
            .filter_map(move |p| {
                let path = p.join(&file);
                let metadata = path.metadata().ok()?;
                let mode = metadata.permissions().mode();
                (metadata.is_file() && mode & 0o111 != 0).then_some(path)
            })
    }
}
