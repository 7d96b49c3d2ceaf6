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

// Sample access code and testing ground for the library: an end-to-end run
// through bucket/object lifecycle calls against a live endpoint.

#![allow(unused_imports)]

use std::str;

use droplet_rs::aws::common::backend::S3Backend;
use droplet_rs::aws::common::client::Client;
use droplet_rs::aws::common::context::{Context, EndpointEntry, SignatureVersion};
use droplet_rs::aws::common::credentials::{AwsCredentialsProvider, DefaultCredentialsProvider};
use droplet_rs::aws::common::metadata::Metadata;
use droplet_rs::aws::common::region::Region;

fn main() {
    let provider = DefaultCredentialsProvider::new(None).unwrap();
    let credentials = provider.credentials().unwrap();

    let ctx = Context::new(
        credentials,
        Region::UsEast1,
        SignatureVersion::V4,
        vec![EndpointEntry::new("s3.amazonaws.com", 443)],
    );
    let client = Client::new(ctx, S3Backend);

    let bucket_name = "cm2test";
    let key = "mytest.txt";

    println!("creating bucket {}", bucket_name);
    match client.make_bucket(bucket_name) {
        Ok(resp) => println!("  -> {}", resp.status),
        Err(e) => println!("  -> error: {:?}", e),
    }

    println!("heading bucket {}", bucket_name);
    match client.head(bucket_name, "/") {
        Ok(resp) => println!("  -> {} {:?}", resp.status, resp.system_metadata),
        Err(e) => println!("  -> error: {:?}", e),
    }

    println!("putting object {}/{}", bucket_name, key);
    let mut meta = Metadata::new();
    meta.insert("purpose".to_string(), "demo".to_string());
    match client.put(bucket_name, &format!("/{}", key), b"this is a test.".to_vec(), &meta) {
        Ok(resp) => println!("  -> {} etag={:?}", resp.status, resp.system_metadata.etag),
        Err(e) => println!("  -> error: {:?}", e),
    }

    println!("getting object {}/{}", bucket_name, key);
    match client.get(bucket_name, &format!("/{}", key)) {
        Ok(resp) => println!("  -> {:?}", str::from_utf8(&resp.body).unwrap_or("<non-utf8 body>")),
        Err(e) => println!("  -> error: {:?}", e),
    }

    println!("presigning a GET url for {}/{}", bucket_name, key);
    match client.genurl(bucket_name, &format!("/{}", key), 3600) {
        Ok(url) => println!("  -> {}", url),
        Err(e) => println!("  -> error: {:?}", e),
    }

    println!("listing bucket {}", bucket_name);
    match client.list_bucket(bucket_name) {
        Ok(resp) => println!("  -> {}", str::from_utf8(&resp.body).unwrap_or("<non-utf8 body>")),
        Err(e) => println!("  -> error: {:?}", e),
    }

    println!("deleting object {}/{}", bucket_name, key);
    match client.delete(bucket_name, &format!("/{}", key)) {
        Ok(resp) => println!("  -> {}", resp.status),
        Err(e) => println!("  -> error: {:?}", e),
    }

    println!("listing all buckets");
    match client.list_all_buckets() {
        Ok(resp) => println!("  -> {}", str::from_utf8(&resp.body).unwrap_or("<non-utf8 body>")),
        Err(e) => println!("  -> error: {:?}", e),
    }

    println!("deleting bucket {}", bucket_name);
    match client.delete_bucket(bucket_name) {
        Ok(resp) => println!("  -> {}", resp.status),
        Err(e) => println!("  -> error: {:?}", e),
    }
}
