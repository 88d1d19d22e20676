/* 📖 # What is filekit_core?

A file and directory API with two interchangeable backends: `LocalFile`/`LocalDirectory`
operate on the local filesystem directly, `CommandExecutorFile`/`CommandExecutorDirectory`
perform the same operations through shell commands run by a `CommandExecutor`.

Both backends implement only the primitives of the `File` and `Directory` traits. All
higher level operations live in `FileBase` and `DirectoryBase`, reached via `base()`:

```ignore
let file = LocalFile::new("notes.txt")?;
file.base().ensure_line_in_file(&ctx, "remember the milk")?;
```
*/

mod back_reference;
pub mod change_summary;
pub mod command;
pub mod directory;
pub mod directory_base;
pub mod executor;
pub mod file;
pub mod file_base;
pub mod filename_date;
pub mod local;
pub mod mime;
pub mod path;
pub mod text_blocks;


pub use change_summary::ChangeSummary;
pub use command::{CommandExecutorDirectory, CommandExecutorFile};
pub use directory::{Directory, DirectoryHandle, ListDirectoryOptions};
pub use directory_base::DirectoryBase;
pub use executor::{
    CommandExecutor, CommandOutput, ExecutorHandle, LOCALHOST, LocalCommandExecutor,
    RunCommandOptions,
};
pub use file::{ChmodOptions, ChownOptions, File, FileHandle};
pub use file_base::FileBase;
pub use local::{LocalDirectory, LocalFile};
pub use path::{get_absolute_path, is_absolute_path, is_relative_path};
pub use text_blocks::{sort_text_blocks, text_blocks};
