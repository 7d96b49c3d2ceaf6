// Copyright 2016 LambdaStack All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Portions borrowed from the rusoto project. See README.md

//! Client Documentation
//!
//! The credentials provider chain: environment variables, explicit
//! parameters, the `~/.aws/credentials` profile file, and EC2 instance
//! metadata, tried in that order by `ChainProvider`. `AutoRefreshingProvider`
//! wraps any provider and re-fetches once the cached credentials are close
//! to expiring.

use std::env;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::io::prelude::*;
use std::io::{BufReader, Write as IoWrite};
use std::collections::HashMap;
use std::sync::Mutex;
use std::cell::RefCell;
use std::net::TcpStream;
use std::time::Duration as StdDuration;

use regex::Regex;
use chrono::{Duration, Utc, DateTime};
use serde_json::{Value, from_str};

use crate::aws::errors::creds::CredentialsError;

/// Primarily intended for client applications but also used for internal library documentation.
///
/// AwsCredentials - Base struct for AWS
///
/// This struct is very important! Without valid credentials then access to AWS S3 will be
/// allowed.
#[derive(Clone, Debug)]
pub struct AwsCredentials {
    /// access_key_id - Can be &str or String. Represents AWS Access Key.
    access_key_id: String,
    /// secret_key - Can be &str or String. Represents AWS Secret Key.
    secret_access_key: String,
    /// token - None or String. Represents AWS Token for IAM credentials.
    token: Option<String>,
    /// expires_at - Default to 10 minutes.
    expires_at: DateTime<Utc>,
}

impl AwsCredentials {
    /// First method to be called. Creates the AWS credentials.
    pub fn new<K, S>(
        access_key_id: K,
        secret_access_key: S,
        token: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> AwsCredentials
    where
        K: Into<String>,
        S: Into<String>,
    {
        AwsCredentials {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            token,
            expires_at,
        }
    }

    /// Get a reference to the access key ID.
    pub fn aws_access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get a reference to the secret key.
    pub fn aws_secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Get a reference to the expiration time.
    pub fn expires_at(&self) -> &DateTime<Utc> {
        &self.expires_at
    }

    /// Get a reference to the access token.
    pub fn token(&self) -> &Option<String> {
        &self.token
    }

    /// Determine whether or not the credentials have expired.
    fn credentials_are_expired(&self) -> bool {
        self.expires_at < Utc::now() + Duration::seconds(20)
    }
}

/// A trait for types that produce `AwsCredentials` This trait is implemented on most S3 calls.
pub trait AwsCredentialsProvider {
    /// Produce a new `AwsCredentials`.
    fn credentials(&self) -> Result<AwsCredentials, CredentialsError>;
}

/// Provides AWS credentials from environment variables.
pub struct EnvironmentProvider;

impl AwsCredentialsProvider for EnvironmentProvider {
    fn credentials(&self) -> Result<AwsCredentials, CredentialsError> {
        let env_key = match env::var("AWS_ACCESS_KEY_ID") {
            Ok(val) => val,
            Err(_) => return Err(CredentialsError::new("No AWS_ACCESS_KEY_ID in environment")),
        };
        let env_secret = match env::var("AWS_SECRET_ACCESS_KEY") {
            Ok(val) => val,
            Err(_) => return Err(CredentialsError::new("No AWS_SECRET_ACCESS_KEY in environment")),
        };

        if env_key.is_empty() || env_secret.is_empty() {
            return Err(CredentialsError::new(
                "Couldn't find either AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY or both in environment.",
            ));
        }

        // Present when using temporary credentials, e.g. on Lambda with IAM roles
        let token = match env::var("AWS_SESSION_TOKEN") {
            Ok(val) => {
                if val.is_empty() {
                    None
                } else {
                    Some(val)
                }
            }
            Err(_) => None,
        };

        Ok(AwsCredentials::new(env_key, env_secret, token, in_ten_minutes()))
    }
}

/// Provides AWS credentials via Parameters. This allows you to use your own config settings
/// and pull the credentials from there and set them here. This is also part of the chained
/// provider where all of the credential providers can be tried in a given order of priority.
#[derive(Clone, Debug)]
pub struct ParametersProvider {
    credentials: Option<AwsCredentials>,
}

impl ParametersProvider {
    pub fn new() -> Result<ParametersProvider, CredentialsError> {
        Ok(ParametersProvider { credentials: None })
    }

    pub fn with_params<K, S>(
        access_key_id: K,
        secret_access_key: S,
        token: Option<String>,
    ) -> Result<ParametersProvider, CredentialsError>
    where
        K: Into<String>,
        S: Into<String>,
    {
        let key = access_key_id.into();
        let secret = secret_access_key.into();

        if key.is_empty() || secret.is_empty() {
            return Err(CredentialsError::new("Keys are invalid."));
        }

        Ok(ParametersProvider {
            credentials: Some(AwsCredentials::new(key, secret, token, in_ten_minutes())),
        })
    }
}

impl AwsCredentialsProvider for ParametersProvider {
    fn credentials(&self) -> Result<AwsCredentials, CredentialsError> {
        match self.credentials {
            None => Err(CredentialsError::new("No credentials.")),
            Some(ref creds) => Ok(creds.to_owned()),
        }
    }
}

/// Provides AWS credentials from a profile in a credentials file.
///
/// The credentials file is located in the home directory of the given user.
#[derive(Clone, Debug)]
pub struct ProfileProvider {
    location: PathBuf,
    profile: String,
}

impl ProfileProvider {
    /// Create a new `ProfileProvider` for the default credentials file path and profile name.
    ///
    /// More details on the AWS credentials file can be found at AWS.
    /// Linux or Mac OS - ~/.aws/credentials
    /// Windows - %USERPROFILE%\.aws\credentials
    ///
    /// Sets the "default" credentials but can be overridden with set_profile.
    pub fn new() -> Result<ProfileProvider, CredentialsError> {
        let location = match env::var_os("HOME").map(PathBuf::from) {
            Some(home) => {
                let mut credentials_path = PathBuf::from(".aws");
                credentials_path.push("credentials");
                home.join(credentials_path)
            }
            None => return Err(CredentialsError::new("The environment variable HOME must be set.")),
        };

        Ok(ProfileProvider {
            location,
            profile: "default".to_owned(),
        })
    }

    /// Create a new `ProfileProvider` for the credentials file at the given path, using
    /// the given profile.
    pub fn with_configuration<F, P>(location: F, profile: P) -> ProfileProvider
    where
        F: Into<PathBuf>,
        P: Into<String>,
    {
        ProfileProvider {
            location: location.into(),
            profile: profile.into(),
        }
    }

    /// Get a reference to the credentials location.
    pub fn location(&self) -> &Path {
        self.location.as_ref()
    }

    /// Get a reference to the profile name. Profile name is the subsection in the credentials
    /// file. See AWS for details.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Set the credentials location.
    pub fn set_location<F>(&mut self, location: F)
    where
        F: Into<PathBuf>,
    {
        self.location = location.into();
    }

    /// Set the profile name.
    pub fn set_profile<P>(&mut self, profile: P)
    where
        P: Into<String>,
    {
        self.profile = profile.into();
    }
}

impl AwsCredentialsProvider for ProfileProvider {
    fn credentials(&self) -> Result<AwsCredentials, CredentialsError> {
        parse_credentials_file(self.location()).and_then(|mut profiles| {
            profiles
                .remove(self.profile())
                .ok_or_else(|| CredentialsError::new("Profile not found."))
        })
    }
}

fn parse_credentials_file(location: &Path) -> Result<HashMap<String, AwsCredentials>, CredentialsError> {
    match fs::metadata(location) {
        Err(_) => return Err(CredentialsError::new("Could not stat credentials file.")),
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(CredentialsError::new("Could not open file."));
            }
        }
    };

    let file = File::open(location)?;

    let profile_regex = Regex::new(r"^\[([^\]]+)\]$").unwrap();
    let mut profiles: HashMap<String, AwsCredentials> = HashMap::new();
    let mut access_key_id: Option<String> = None;
    let mut secret_access_key: Option<String> = None;
    let mut profile_name: Option<String> = None;

    let file_lines = BufReader::new(&file);
    for line in file_lines.lines() {
        let unwrapped_line: String = line.unwrap();
        if unwrapped_line.starts_with('#') {
            // Ignore comments
            continue;
        }

        // handle the opening of named profile blocks
        if profile_regex.is_match(&unwrapped_line) {
            if profile_name.is_some() && access_key_id.is_some() && secret_access_key.is_some() {
                let creds =
                    AwsCredentials::new(access_key_id.unwrap(), secret_access_key.unwrap(), None, in_ten_minutes());
                profiles.insert(profile_name.unwrap(), creds);
            }

            access_key_id = None;
            secret_access_key = None;

            let caps = profile_regex.captures(&unwrapped_line).unwrap();
            profile_name = Some(caps.get(1).unwrap().as_str().to_string());
            continue;
        }

        // otherwise look for key=value pairs we care about
        let lower_case_line = unwrapped_line.to_ascii_lowercase();

        if lower_case_line.contains("aws_access_key_id") && access_key_id.is_none() {
            let v: Vec<&str> = unwrapped_line.split('=').collect();
            if v.len() > 1 {
                access_key_id = Some(v[1].trim_matches(' ').to_string());
            }
        } else if lower_case_line.contains("aws_secret_access_key") && secret_access_key.is_none() {
            let v: Vec<&str> = unwrapped_line.split('=').collect();
            if v.len() > 1 {
                secret_access_key = Some(v[1].trim_matches(' ').to_string());
            }
        }
    }

    if profile_name.is_some() && access_key_id.is_some() && secret_access_key.is_some() {
        let creds = AwsCredentials::new(access_key_id.unwrap(), secret_access_key.unwrap(), None, in_ten_minutes());
        profiles.insert(profile_name.unwrap(), creds);
    }

    if profiles.is_empty() {
        return Err(CredentialsError::new("No credentials found."));
    }

    Ok(profiles)
}

/// Issues a bare HTTP/1.0 GET over a plain TCP socket and returns the response body.
///
/// The instance metadata service is plaintext, loopback-only (`169.254.169.254`) and does not
/// need the signing/pool/TLS machinery the rest of the crate builds for talking to the object
/// store itself, so a minimal one-shot client is used here instead of pulling in the full wire
/// stack for a single unauthenticated GET.
fn metadata_http_get(host: &str, path: &str) -> Result<String, CredentialsError> {
    let mut stream = TcpStream::connect((host, 80))
        .map_err(|_| CredentialsError::new("Couldn't connect to metadata service"))?;
    stream
        .set_read_timeout(Some(StdDuration::from_secs(15)))
        .map_err(|_| CredentialsError::new("Couldn't set metadata service timeout"))?;

    let req = format!(
        "GET {} HTTP/1.0\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host
    );
    stream
        .write_all(req.as_bytes())
        .map_err(|_| CredentialsError::new("Couldn't write to metadata service"))?;

    let mut raw = String::new();
    stream
        .read_to_string(&mut raw)
        .map_err(|_| CredentialsError::new("Didn't get a parsable response body from metadata service"))?;

    match raw.find("\r\n\r\n") {
        Some(idx) => Ok(raw[idx + 4..].to_string()),
        None => Err(CredentialsError::new("Malformed metadata service response")),
    }
}

/// Provides AWS credentials from a resource's IAM role. Note: This is not fully tested.
#[derive(Clone, Debug)]
pub struct IamProvider;

impl AwsCredentialsProvider for IamProvider {
    fn credentials(&self) -> Result<AwsCredentials, CredentialsError> {
        const HOST: &str = "169.254.169.254";
        const BASE_PATH: &str = "/latest/meta-data/iam/security-credentials";

        let role = metadata_http_get(HOST, BASE_PATH)?;
        let body = metadata_http_get(HOST, &format!("{}/{}", BASE_PATH, role.trim()))?;

        let json_object: Value =
            from_str(&body).map_err(|_| CredentialsError::new("Couldn't parse metadata response body."))?;

        let access_key_id = json_object
            .get("AccessKeyId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CredentialsError::new("Couldn't find AccessKeyId in response."))?
            .to_owned();

        let secret_access_key = json_object
            .get("SecretAccessKey")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CredentialsError::new("Couldn't find SecretAccessKey in response."))?
            .to_owned();

        let expiration = json_object
            .get("Expiration")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CredentialsError::new("Couldn't find Expiration in response."))?;

        let expiration_time: DateTime<Utc> = expiration.parse()?;

        let token_from_response = json_object
            .get("Token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CredentialsError::new("Couldn't find Token in response."))?
            .to_owned();

        Ok(AwsCredentials::new(
            access_key_id,
            secret_access_key,
            Some(token_from_response),
            expiration_time,
        ))
    }
}

/// Wrapper for AwsCredentialsProvider that caches the credentials returned by the
/// wrapped provider.  Each time the credentials are accessed, they are checked to see if
/// they have expired, in which case they are retrieved from the wrapped provider again.
pub struct BaseAutoRefreshingProvider<P, T> {
    pub credentials_provider: P,
    cached_credentials: T,
}

/// Threadsafe AutoRefreshingProvider that locks cached credentials with a Mutex
pub type AutoRefreshingProviderSync<P> = BaseAutoRefreshingProvider<P, Mutex<AwsCredentials>>;

impl<P: AwsCredentialsProvider> AutoRefreshingProviderSync<P> {
    pub fn with_mutex(provider: P) -> Result<AutoRefreshingProviderSync<P>, CredentialsError> {
        let creds = provider.credentials()?;
        Ok(BaseAutoRefreshingProvider {
            credentials_provider: provider,
            cached_credentials: Mutex::new(creds),
        })
    }
}

impl<P: AwsCredentialsProvider> AwsCredentialsProvider for BaseAutoRefreshingProvider<P, Mutex<AwsCredentials>> {
    fn credentials(&self) -> Result<AwsCredentials, CredentialsError> {
        let mut creds = self.cached_credentials.lock().unwrap();
        if creds.credentials_are_expired() {
            *creds = self.credentials_provider.credentials()?;
        }
        Ok(creds.clone())
    }
}

/// !Sync AutoRefreshingProvider that caches credentials in a RefCell
pub type AutoRefreshingProvider<P> = BaseAutoRefreshingProvider<P, RefCell<AwsCredentials>>;

impl<P: AwsCredentialsProvider> AutoRefreshingProvider<P> {
    pub fn with_refcell(provider: P) -> Result<AutoRefreshingProvider<P>, CredentialsError> {
        let creds = provider.credentials()?;
        Ok(BaseAutoRefreshingProvider {
            credentials_provider: provider,
            cached_credentials: RefCell::new(creds),
        })
    }
}

impl<P: AwsCredentialsProvider> AwsCredentialsProvider for BaseAutoRefreshingProvider<P, RefCell<AwsCredentials>> {
    fn credentials(&self) -> Result<AwsCredentials, CredentialsError> {
        let mut creds = self.cached_credentials.borrow_mut();
        if creds.credentials_are_expired() {
            *creds = self.credentials_provider.credentials()?;
        }
        Ok(creds.clone())
    }
}

/// The credentials provider you probably want to use if you don't require Sync for your
/// AWS services. Wraps a ChainProvider in an AutoRefreshingProvider that uses a RefCell to cache
/// credentials.
///
/// The underlying ChainProvider checks multiple sources for credentials, and the
/// AutoRefreshingProvider refreshes the credentials automatically when they expire. The RefCell
/// allows this caching to happen without the overhead of a Mutex, but is !Sync.
///
/// For a Sync implementation of the same, see DefaultCredentialsProviderSync
pub type DefaultCredentialsProvider = AutoRefreshingProvider<ChainProvider>;

impl DefaultCredentialsProvider {
    pub fn new(parameters_provider: Option<ParametersProvider>) -> Result<DefaultCredentialsProvider, CredentialsError> {
        AutoRefreshingProvider::with_refcell(ChainProvider::new(parameters_provider))
    }
}

/// The credentials provider you probably want to use if you do require your AWS services sync.
/// Wraps a ChainProvider in an AutoRefreshingProvider that uses a Mutex to lock credentials in a
/// threadsafe manner.
///
/// The underlying ChainProvider checks multiple sources for credentials, and the
/// AutoRefreshingProvider refreshes the credentials automatically when they expire.  The Mutex
/// allows this caching to happen in a Sync manner, incurring the overhead of a Mutex when
/// credentials expire and need to be refreshed.
///
/// For a !Sync implementation of the same, see DefaultCredentialsProvider
pub type DefaultCredentialsProviderSync = AutoRefreshingProviderSync<ChainProvider>;

impl DefaultCredentialsProviderSync {
    pub fn new(parameters_provider: Option<ParametersProvider>) -> Result<DefaultCredentialsProviderSync, CredentialsError> {
        AutoRefreshingProviderSync::with_mutex(ChainProvider::new(parameters_provider))
    }
}

/// Provides AWS credentials from multiple possible sources using a priority order.
///
/// The following sources are checked in order for credentials when calling `credentials`:
///
/// 1. Environment variables: `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY`
/// 2. Parameters option. This is set in your code however you wish to set it. For example,
///    you could read from your own config file and set them or however.
/// 3. AWS credentials file. Usually located at `~/.aws/credentials`.
/// 4. IAM instance profile. Will only work if running on an EC2 instance with an instance
///    profile/role.
///
/// If the sources are exhausted without finding credentials, an error is returned.
/// NB: If the chain makes it to the IAM provider then TCP timeout may cause a wait.
#[derive(Debug, Clone)]
pub struct ChainProvider {
    parameters_provider: Option<ParametersProvider>,
    profile_provider: Option<ProfileProvider>,
}

impl AwsCredentialsProvider for ChainProvider {
    fn credentials(&self) -> Result<AwsCredentials, CredentialsError> {
        EnvironmentProvider
            .credentials()
            .or_else(|_| match self.parameters_provider {
                Some(ref provider) => provider.credentials(),
                None => Err(CredentialsError::new("")),
            })
            .or_else(|_| match self.profile_provider {
                Some(ref provider) => provider.credentials(),
                None => Err(CredentialsError::new("")),
            })
            .or_else(|_| IamProvider.credentials())
            .or_else(|_| {
                Err(CredentialsError::new(
                    "Couldn't find AWS credentials in environment, credentials file, or IAM role.",
                ))
            })
    }
}

impl ChainProvider {
    /// Create a new `ChainProvider` using a `ParametersProvider` with the default settings.
    pub fn new(parameters_provider: Option<ParametersProvider>) -> ChainProvider {
        ChainProvider {
            parameters_provider,
            profile_provider: ProfileProvider::new().ok(),
        }
    }

    /// Create a new `ChainProvider` using the provided `ParametersProvider`.
    pub fn with_param_provider(&self, parameters_provider: ParametersProvider) -> ChainProvider {
        ChainProvider {
            parameters_provider: Some(parameters_provider),
            profile_provider: None,
        }
    }

    /// Create a new `ChainProvider` using the provided `ProfileProvider`.
    pub fn with_profile_provider(&self, profile_provider: ProfileProvider) -> ChainProvider {
        ChainProvider {
            parameters_provider: None,
            profile_provider: Some(profile_provider),
        }
    }
}

// Basic internal function for returning the time ten minutes from now.
fn in_ten_minutes() -> DateTime<Utc> {
    Utc::now() + Duration::seconds(600)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_credentials_are_not_expired() {
        let creds = AwsCredentials::new("AKIA", "secret", None, in_ten_minutes());
        assert!(!creds.credentials_are_expired());
    }

    #[test]
    fn parameters_provider_rejects_empty_keys() {
        assert!(ParametersProvider::with_params("", "secret", None).is_err());
    }

    #[test]
    fn parameters_provider_roundtrips_credentials() {
        let provider = ParametersProvider::with_params("AKIA", "secret", None).unwrap();
        let creds = provider.credentials().unwrap();
        assert_eq!(creds.aws_access_key_id(), "AKIA");
        assert_eq!(creds.aws_secret_access_key(), "secret");
    }
}
