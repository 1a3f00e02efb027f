// Copyright 2025 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::sync::Arc;

use cellfill::config::Config;
use cellfill::providers::ModelBackend;
use cellfill::server;

#[derive(Args, Debug)]
pub struct ServeArgs {
	/// Address to bind (overrides server.host)
	#[arg(long)]
	pub host: Option<String>,

	/// Port to listen on (overrides server.port)
	#[arg(long, short)]
	pub port: Option<u16>,
}

pub async fn execute(args: &ServeArgs, backend: Arc<dyn ModelBackend>, mut config: Config) -> Result<()> {
	if let Some(host) = &args.host {
		config.server.host = host.clone();
	}
	if let Some(port) = args.port {
		config.server.port = port;
	}

	if !backend.is_configured() {
		eprintln!(
			"{}",
			"Warning: OPENAI_API_KEY is not set, generation requests will fail".yellow()
		);
	}

	println!(
		"Serving on http://{}:{}",
		config.server.host, config.server.port
	);
	server::serve(backend, &config).await
}
