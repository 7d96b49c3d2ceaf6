/*
 Copyright 2016 LambdaStack All rights reserved.

 Licensed under the Apache License, Version 2.0 (the "License");
 you may not use this file except in compliance with the License.
 You may obtain a copy of the License at

 http://www.apache.org/licenses/LICENSE-2.0

 Unless required by applicable law or agreed to in writing, software
 distributed under the License is distributed on an "AS IS" BASIS,
 WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 See the License for the specific language governing permissions and
 limitations under the License.
*/

// Sample access code and testing ground for the library.

// Allow unused_imports file wide because it allows you to comment out parts of the code without
// seeing warnings.
#![allow(unused_imports)]

use std::str;

use droplet_rs::aws::common::backend::S3Backend;
use droplet_rs::aws::common::client::Client;
use droplet_rs::aws::common::context::{Context, EndpointEntry, SignatureVersion};
use droplet_rs::aws::common::credentials::{AwsCredentialsProvider, DefaultCredentialsProvider};
use droplet_rs::aws::common::metadata::Metadata;
use droplet_rs::aws::common::region::Region;
use droplet_rs::aws::s3::acl::CannedAcl;

fn main() {
    // DefaultCredentialsProvider cycles through the provider chain in order:
    // 1. Environment - AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY / AWS_SESSION_TOKEN
    // 2. Parameters passed in via ParametersProvider (see example below)
    // 3. Profile provider - ~/.aws/credentials
    // 4. IAM Provider

    /* Example of using parameters for passing the credentials.
    use droplet_rs::aws::common::credentials::ParametersProvider;

    let param_provider = Some(
        ParametersProvider::with_params(
            "<whatever your access_key_id>",
            "<whatever your secret_access_key>",
            None).unwrap()
    );

    let provider = DefaultCredentialsProvider::new(param_provider).unwrap();
    */

    let provider = DefaultCredentialsProvider::new(None).unwrap();
    let credentials = provider.credentials().unwrap();

    // V4 is the default signature for AWS; some compatible products (Ceph,
    // early Scality deployments) still speak V2 only.
    let ctx = Context::new(
        credentials,
        Region::UsEast1,
        SignatureVersion::V4,
        vec![EndpointEntry::new("s3.amazonaws.com", 443)],
    );
    let client = Client::new(ctx, S3Backend);

    let bucket_name = "cm2test";

    /*
    match client.make_bucket(bucket_name) {
        Ok(resp) => println!("{}", resp.status),
        Err(e) => println!("{:?}", e),
    }
    */

    match client.head(bucket_name, "/") {
        Ok(resp) => println!("{:?} {:?}", resp.status, resp.system_metadata),
        Err(e) => println!("{:?}", e),
    }

    /*
    let mut meta = Metadata::new();
    meta.insert("purpose".to_string(), "smoke-test".to_string());

    match client.put(bucket_name, "/mytest.txt", b"this is a test.".to_vec(), &meta) {
        Ok(resp) => println!("{:?}", resp.status),
        Err(e) => println!("{:?}", e),
    }

    match client.get(bucket_name, "/mytest.txt") {
        Ok(resp) => println!("\n\n{:?}\n\n", str::from_utf8(&resp.body).unwrap()),
        Err(e) => println!("{:?}", e),
    }

    match client.delete(bucket_name, "/mytest.txt") {
        Ok(resp) => println!("{:?}", resp.status),
        Err(e) => println!("{:?}", e),
    }

    match client.list_bucket(bucket_name) {
        Ok(resp) => println!("{}", str::from_utf8(&resp.body).unwrap_or("<non-utf8 body>")),
        Err(e) => println!("{:?}", e),
    }

    match client.delete_bucket(bucket_name) {
        Ok(resp) => println!("{:?}", resp.status),
        Err(e) => println!("{:?}", e),
    }
    */
}
