//! Hand-rolled CLI parser for this binary's `-flag:value` grammar.
//! `clap`'s derive parser expects `--flag value`/`--flag=value` forms;
//! re-deriving a single-dash, single-colon grammar through clap's builder
//! API would fight the library more than it would save, so this module
//! parses the arguments directly and applies them onto a [`CamwebConfig`].
//! Parsing stops at the first malformed option; the caller should print
//! [`USAGE`] and exit non-zero.

use crate::config::{resolution_for_index, CamwebConfig};

pub const USAGE: &str = "\
Usage: camweb [options]

  -size:<0-7>        camera resolution table index
  -fps:<1-30>         target capture frame rate
  -jpeg:<1-100>       JPEG quality
  -port:<1-65535>     HTTP port
  -realm:<string>     HTTP authentication realm
  -htpass:<path>      htdigest-style user file
  -viewer:<any|user|admin>   minimum group for viewing endpoints
  -config:<any|user|admin>   minimum group for configuration endpoints
  -fcfg:<path>        camera property persistence file
  -web:<path>         static web root
  -title:<string>     overlay title burned into frames
";

#[derive(Debug)]
pub struct CliError {
    pub message: String,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn bad(option: &str, reason: impl std::fmt::Display) -> CliError {
    CliError {
        message: format!("invalid option '{option}': {reason}"),
    }
}

/// Apply `-flag:value` style arguments onto `config`, stopping at the
/// first one that doesn't parse.
pub fn apply_args(config: &mut CamwebConfig, args: &[String]) -> Result<(), CliError> {
    for arg in args {
        let Some((flag, value)) = arg.split_once(':') else {
            return Err(bad(arg, "expected '-flag:value'"));
        };
        match flag {
            "-size" => {
                let index: u8 = value.parse().map_err(|_| bad(arg, "not a number"))?;
                if resolution_for_index(index).is_none() {
                    return Err(bad(arg, "size index out of range (0-7)"));
                }
                config.camera.size_index = index;
            }
            "-fps" => {
                let fps: u32 = value.parse().map_err(|_| bad(arg, "not a number"))?;
                if !(1..=30).contains(&fps) {
                    return Err(bad(arg, "fps out of range (1-30)"));
                }
                config.camera.fps = fps;
            }
            "-jpeg" => {
                let quality: u8 = value.parse().map_err(|_| bad(arg, "not a number"))?;
                if !(1..=100).contains(&quality) {
                    return Err(bad(arg, "quality out of range (1-100)"));
                }
                config.camera.jpeg_quality = quality;
            }
            "-port" => {
                let port: u32 = value.parse().map_err(|_| bad(arg, "not a number"))?;
                if !(1..=65535).contains(&port) {
                    return Err(bad(arg, "port out of range (1-65535)"));
                }
                config.http.port = port as u16;
            }
            "-realm" => {
                if value.is_empty() {
                    return Err(bad(arg, "realm must not be empty"));
                }
                config.auth.realm = value.to_string();
            }
            "-htpass" => {
                config.auth.htpasswd_path = Some(value.into());
            }
            "-viewer" => {
                validate_group(arg, value)?;
                config.auth.viewer_group = value.to_string();
            }
            "-config" => {
                validate_group(arg, value)?;
                config.auth.config_group = value.to_string();
            }
            "-fcfg" => {
                config.files.camera_config_path = Some(value.into());
            }
            "-web" => {
                config.http.web_root = Some(value.into());
            }
            "-title" => {
                config.camera.title = Some(value.to_string());
            }
            other => return Err(bad(other, "unrecognized option")),
        }
    }
    Ok(())
}

fn validate_group(arg: &str, value: &str) -> Result<(), CliError> {
    match value {
        "any" | "user" | "admin" => Ok(()),
        _ => Err(bad(arg, "expected one of any, user, admin")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_a_full_set_of_valid_flags() {
        let mut config = CamwebConfig::default();
        let args: Vec<String> = vec![
            "-size:5", "-fps:24", "-jpeg:70", "-port:9000", "-realm:cam2web",
            "-viewer:user", "-config:admin", "-title:Front Door",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        apply_args(&mut config, &args).unwrap();
        assert_eq!(config.camera.size_index, 5);
        assert_eq!(config.camera.fps, 24);
        assert_eq!(config.camera.jpeg_quality, 70);
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.auth.realm, "cam2web");
        assert_eq!(config.auth.viewer_group, "user");
        assert_eq!(config.auth.config_group, "admin");
        assert_eq!(config.camera.title.as_deref(), Some("Front Door"));
    }

    #[test]
    fn rejects_size_index_eight() {
        let mut config = CamwebConfig::default();
        let args = vec!["-size:8".to_string()];
        assert!(apply_args(&mut config, &args).is_err());
    }

    #[test]
    fn stops_at_first_malformed_option_leaving_earlier_ones_applied() {
        let mut config = CamwebConfig::default();
        let args = vec!["-fps:10".to_string(), "-jpeg:500".to_string(), "-port:1234".to_string()];
        let result = apply_args(&mut config, &args);
        assert!(result.is_err());
        assert_eq!(config.camera.fps, 10);
        assert_eq!(config.http.port, 8080); // unchanged: parsing stopped before this flag
    }

    #[test]
    fn rejects_unknown_flag() {
        let mut config = CamwebConfig::default();
        let args = vec!["-bogus:1".to_string()];
        assert!(apply_args(&mut config, &args).is_err());
    }

    #[test]
    fn rejects_malformed_group_value() {
        let mut config = CamwebConfig::default();
        let args = vec!["-viewer:superuser".to_string()];
        assert!(apply_args(&mut config, &args).is_err());
    }
}
