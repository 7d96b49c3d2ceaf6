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

//! Library Documentation
//!
//! `Region` only matters to the S3 backend: it selects the scope component of
//! the V4 signing key and, when no explicit `Endpoint` is given, the default
//! hostname. Other backends (Swift, SRWS, CDMI) ignore it and should use
//! `Region::UsEast1` as a harmless default.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    UsEast1,
    UsWest1,
    UsWest2,
    EuWest1,
    EuCentral1,
    ApSoutheast1,
    ApSoutheast2,
    ApNortheast1,
    SaEast1,
    CnNorth1,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            Region::UsEast1 => "us-east-1",
            Region::UsWest1 => "us-west-1",
            Region::UsWest2 => "us-west-2",
            Region::EuWest1 => "eu-west-1",
            Region::EuCentral1 => "eu-central-1",
            Region::ApSoutheast1 => "ap-southeast-1",
            Region::ApSoutheast2 => "ap-southeast-2",
            Region::ApNortheast1 => "ap-northeast-1",
            Region::SaEast1 => "sa-east-1",
            Region::CnNorth1 => "cn-north-1",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Region, String> {
        match s {
            "us-east-1" => Ok(Region::UsEast1),
            "us-west-1" => Ok(Region::UsWest1),
            "us-west-2" => Ok(Region::UsWest2),
            "eu-west-1" => Ok(Region::EuWest1),
            "eu-central-1" => Ok(Region::EuCentral1),
            "ap-southeast-1" => Ok(Region::ApSoutheast1),
            "ap-southeast-2" => Ok(Region::ApSoutheast2),
            "ap-northeast-1" => Ok(Region::ApNortheast1),
            "sa-east-1" => Ok(Region::SaEast1),
            "cn-north-1" => Ok(Region::CnNorth1),
            v => Err(format!("Not a valid AWS region: {}", v)),
        }
    }
}

impl Default for Region {
    fn default() -> Region {
        Region::UsEast1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        for region in &[Region::UsEast1, Region::CnNorth1, Region::EuCentral1] {
            let s = region.to_string();
            assert_eq!(*region, s.parse::<Region>().unwrap());
        }
    }
}
