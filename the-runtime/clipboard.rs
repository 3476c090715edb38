//! Clipboard provider implementations for runtime hosts.
//!
//! This module provides an OS-aware clipboard provider that implements the
//! the-lib clipboard trait. Both the `*` and `+` registers end up here, so
//! only the system clipboard is driven; primary selections are left alone.

use std::borrow::Cow;

use serde::{
  Deserialize,
  Serialize,
};
use the_lib::clipboard::{
  ClipboardError,
  ClipboardProvider as ClipboardBackend,
  Result,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Command {
  command: Cow<'static, str>,
  #[serde(default)]
  args:    Cow<'static, [Cow<'static, str>]>,
}

/// A pair of shell commands: `copy` reads the text on stdin, `paste` prints
/// the clipboard on stdout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CommandProvider {
  copy:  Command,
  paste: Command,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ClipboardProvider {
  Pasteboard,
  Wayland,
  XClip,
  XSel,
  Win32Yank,
  Tmux,
  #[cfg(windows)]
  Windows,
  Termux,
  Custom(CommandProvider),
  None,
}

impl ClipboardProvider {
  pub fn detect() -> Self {
    let provider = Self::default();
    tracing::debug!(provider = %provider.name(), "detected clipboard provider");
    provider
  }
}

impl Default for ClipboardProvider {
  #[cfg(windows)]
  fn default() -> Self {
    use the_stdx::env::binary_exists;

    if binary_exists("win32yank.exe") {
      Self::Win32Yank
    } else {
      Self::Windows
    }
  }

  #[cfg(target_os = "macos")]
  fn default() -> Self {
    use the_stdx::env::{
      binary_exists,
      env_var_is_set,
    };

    if env_var_is_set("TMUX") && binary_exists("tmux") {
      Self::Tmux
    } else if binary_exists("pbcopy") && binary_exists("pbpaste") {
      Self::Pasteboard
    } else {
      Self::None
    }
  }

  #[cfg(not(any(windows, target_os = "macos")))]
  fn default() -> Self {
    use the_stdx::env::{
      binary_exists,
      env_var_is_set,
    };

    fn is_exit_success(program: &str, args: &[&str]) -> bool {
      std::process::Command::new(program)
        .args(args)
        .output()
        .ok()
        .and_then(|out| out.status.success().then_some(()))
        .is_some()
    }

    if env_var_is_set("WAYLAND_DISPLAY") && binary_exists("wl-copy") && binary_exists("wl-paste")
    {
      Self::Wayland
    } else if env_var_is_set("DISPLAY") && binary_exists("xclip") {
      Self::XClip
    } else if env_var_is_set("DISPLAY")
              && binary_exists("xsel")
              && is_exit_success("xsel", &["-o", "-b"])
    {
      Self::XSel
    } else if binary_exists("termux-clipboard-set") && binary_exists("termux-clipboard-get") {
      Self::Termux
    } else if env_var_is_set("TMUX") && binary_exists("tmux") {
      Self::Tmux
    } else if binary_exists("win32yank.exe") {
      Self::Win32Yank
    } else {
      Self::None
    }
  }
}

impl ClipboardProvider {
  fn builtin(&self) -> Option<&'static CommandProvider> {
    match self {
      Self::Pasteboard => Some(&PASTEBOARD),
      Self::Wayland => Some(&WL_CLIPBOARD),
      Self::XClip => Some(&XCLIP),
      Self::XSel => Some(&XSEL),
      Self::Win32Yank => Some(&WIN32),
      Self::Tmux => Some(&TMUX),
      Self::Termux => Some(&TERMUX),
      _ => None,
    }
  }
}

impl ClipboardBackend for ClipboardProvider {
  fn name(&self) -> Cow<'_, str> {
    fn command_name<'a>(name: &str, provider: &CommandProvider) -> Cow<'a, str> {
      if provider.copy.command != provider.paste.command {
        Cow::Owned(format!(
          "{} ({}+{})",
          name, provider.copy.command, provider.paste.command
        ))
      } else {
        Cow::Owned(format!("{} ({})", name, provider.copy.command))
      }
    }

    match self {
      Self::Pasteboard => command_name("pasteboard", &PASTEBOARD),
      Self::Wayland => command_name("wayland", &WL_CLIPBOARD),
      Self::XClip => command_name("x-clip", &XCLIP),
      Self::XSel => command_name("x-sel", &XSEL),
      Self::Win32Yank => command_name("win-32-yank", &WIN32),
      Self::Tmux => command_name("tmux", &TMUX),
      Self::Termux => command_name("termux", &TERMUX),
      #[cfg(windows)]
      Self::Windows => "windows".into(),
      Self::Custom(command_provider) => command_name("custom", command_provider),
      Self::None => "none".into(),
    }
  }

  fn copy(&self, content: &str) -> Result<()> {
    if let Some(provider) = self.builtin() {
      return execute_command(&provider.copy, Some(content), false).map(|_| ());
    }

    match self {
      #[cfg(target_os = "windows")]
      Self::Windows => {
        clipboard_win::set_clipboard(clipboard_win::formats::Unicode, content)
          .map_err(|err| ClipboardError::Platform(err.to_string()))?;
        Ok(())
      },
      Self::Custom(command_provider) => {
        execute_command(&command_provider.copy, Some(content), false).map(|_| ())
      },
      _ => Ok(()),
    }
  }

  fn paste(&self) -> Result<String> {
    if let Some(provider) = self.builtin() {
      return execute_command(&provider.paste, None, true)?.ok_or(ClipboardError::MissingStdout);
    }

    match self {
      #[cfg(target_os = "windows")]
      Self::Windows => {
        clipboard_win::get_clipboard(clipboard_win::formats::Unicode)
          .map_err(|err| ClipboardError::Platform(err.to_string()))
      },
      Self::Custom(command_provider) => {
        execute_command(&command_provider.paste, None, true)?.ok_or(ClipboardError::MissingStdout)
      },
      _ => Err(ClipboardError::ReadingNotSupported),
    }
  }
}

macro_rules! command_provider {
  ($name:ident,
   copy => $copy_cmd:literal $( , $copy_arg:literal )* ;
   paste => $paste_cmd:literal $( , $paste_arg:literal )* ; ) => {
    static $name: CommandProvider = CommandProvider {
      copy: Command {
        command: Cow::Borrowed($copy_cmd),
        args: Cow::Borrowed(&[ $( Cow::Borrowed($copy_arg) ),* ]),
      },
      paste: Command {
        command: Cow::Borrowed($paste_cmd),
        args: Cow::Borrowed(&[ $( Cow::Borrowed($paste_arg) ),* ]),
      },
    };
  };
}

command_provider! {
  TMUX,
  copy => "tmux", "load-buffer", "-w", "-";
  paste => "tmux", "save-buffer", "-";
}
command_provider! {
  PASTEBOARD,
  copy => "pbcopy";
  paste => "pbpaste";
}
command_provider! {
  WL_CLIPBOARD,
  copy => "wl-copy", "--type", "text/plain";
  paste => "wl-paste", "--no-newline";
}
command_provider! {
  XCLIP,
  copy => "xclip", "-i", "-selection", "clipboard";
  paste => "xclip", "-o", "-selection", "clipboard";
}
command_provider! {
  XSEL,
  copy => "xsel", "-i", "-b";
  paste => "xsel", "-o", "-b";
}
command_provider! {
  WIN32,
  copy => "win32yank.exe", "-i", "--crlf";
  paste => "win32yank.exe", "-o", "--lf";
}
command_provider! {
  TERMUX,
  copy => "termux-clipboard-set";
  paste => "termux-clipboard-get";
}

fn execute_command(cmd: &Command, input: Option<&str>, pipe_output: bool) -> Result<Option<String>> {
  use std::{
    io::Write,
    process::{
      Command as ProcessCommand,
      Stdio,
    },
  };

  let stdin = input.map(|_| Stdio::piped()).unwrap_or_else(Stdio::null);
  let stdout = pipe_output.then(Stdio::piped).unwrap_or_else(Stdio::null);

  let mut command = ProcessCommand::new(cmd.command.as_ref());
  let mut command = command
    .args(cmd.args.iter().map(AsRef::as_ref))
    .stdin(stdin)
    .stdout(stdout)
    .stderr(Stdio::null());

  #[cfg(unix)]
  {
    use std::os::unix::process::CommandExt;

    // Detach from our session so providers that fork (xclip) outlive us.
    unsafe {
      command = command.pre_exec(|| {
        match libc::setsid() {
          -1 => Err(std::io::Error::last_os_error()),
          _ => Ok(()),
        }
      });
    }
  }

  let mut child = command.spawn()?;

  if let Some(input) = input {
    let mut stdin = child.stdin.take().ok_or(ClipboardError::StdinWriteFailed)?;
    stdin
      .write_all(input.as_bytes())
      .map_err(|_| ClipboardError::StdinWriteFailed)?;
  }

  let output = child.wait_with_output()?;

  if !output.status.success() {
    return Err(ClipboardError::CommandFailed);
  }

  if pipe_output {
    Ok(Some(String::from_utf8(output.stdout)?))
  } else {
    Ok(None)
  }
}
