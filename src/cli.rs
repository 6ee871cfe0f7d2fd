use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{
    CommandReport, batch, dump, export, join, mirror, mirror_range,
};
use crate::config;
use crate::elastic::mirror::IndexFilter;
use crate::elastic::query::{BoolQuery, NameValue};

#[derive(Debug, Parser)]
#[command(
    name = "esops",
    version,
    about = "Elasticsearch index mirroring, fsdb export/join, and Kafka rollup batching"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Copy indices from remote hosts to the local Elasticsearch over SSH tunnels
    Mirror(MirrorArgs),
    /// Copy daily indices for a date range from sensor hosts
    MirrorRange(MirrorRangeArgs),
    /// Dump local indices to JSON files with elasticdump
    Dump(DumpArgs),
    /// Run a query and write the hits as an fsdb table
    Export(ExportArgs),
    /// Concatenate fsdb files, optionally splitting domain columns on the public suffix list
    Join(JoinArgs),
    /// Batch IP-reputation topics into windowed per-IP rollups
    Batch(BatchArgs),
}

#[derive(Debug, Args, Default)]
struct FilterArgs {
    /// Regex of indices to copy; default is all
    #[arg(short, long)]
    include: Option<String>,

    /// Regex of indices to exclude; (users|\.|filebeat|metricbeat) is always excluded
    #[arg(short, long)]
    exclude: Option<String>,

    /// Exclude only users and dot-indices, keeping filebeat/metricbeat
    #[arg(short = 'E', long)]
    exclude_override: bool,

    /// Sort the list of indices by embedded date, ascending
    #[arg(short = 'S', long)]
    sort: bool,

    /// Reverse the sort
    #[arg(short, long)]
    reverse: bool,
}

impl FilterArgs {
    fn to_filter(&self) -> IndexFilter {
        IndexFilter {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            exclude_override: self.exclude_override,
            sort: self.sort,
            reverse: self.reverse,
        }
    }
}

#[derive(Debug, Args)]
struct MirrorArgs {
    /// Comma delimited list of ssh host names to copy indices from
    #[arg(short = 's', long, value_delimiter = ',')]
    hosts: Vec<String>,

    /// Local port for the ssh tunnel; random when omitted
    #[arg(long)]
    lport: Option<u16>,

    /// Remote port for the ssh tunnel
    #[arg(long)]
    rport: Option<u16>,

    /// Maximum number of indices to copy; 0 means no limit
    #[arg(short, long, default_value_t = 0)]
    num: u64,

    /// List indices instead of copying
    #[arg(short, long)]
    list: bool,

    /// Prefix for destination index names; default is the host name
    #[arg(short, long)]
    prefix: Option<String>,

    #[command(flatten)]
    filter: FilterArgs,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct MirrorRangeArgs {
    /// Date to start copying daily indices from
    #[arg(short, long)]
    start_date: Option<String>,

    /// Last date to copy; defaults to two days ago and cannot be newer
    #[arg(short, long)]
    end_date: Option<String>,

    /// Comma delimited list of sensor hosts to copy from
    #[arg(short = 't', long, value_delimiter = ',')]
    sensors: Vec<String>,

    /// Local port for the ssh tunnel; random when omitted
    #[arg(long)]
    lport: Option<u16>,

    /// Remote port for the ssh tunnel
    #[arg(long)]
    rport: Option<u16>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct DumpArgs {
    /// Directory to dump index files into
    #[arg(long, default_value = "./")]
    dump_dir: PathBuf,

    /// Prefix for dump file names
    #[arg(short, long, default_value = "")]
    prefix: String,

    /// List what would be dumped instead of dumping
    #[arg(short, long)]
    list: bool,

    #[command(flatten)]
    filter: FilterArgs,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Elasticsearch host
    #[arg(short = 'e', long, default_value = "localhost")]
    eshost: String,

    /// Elasticsearch port
    #[arg(short = 'p', long, default_value_t = 9200)]
    esport: u16,

    /// Elasticsearch index
    #[arg(short, long, default_value = "_all")]
    index: String,

    /// Return size; 0 means everything
    #[arg(short, long, default_value_t = 0)]
    size: u64,

    /// Time field
    #[arg(short, long, default_value = "@timestamp")]
    time_field: String,

    /// Field that must match (logical AND), as name:value
    #[arg(short = 'M', long = "must")]
    must: Vec<NameValue>,

    /// Field that must not match (logical NOT), as name:value
    #[arg(short = 'X', long = "must-not")]
    must_not: Vec<NameValue>,

    /// Field that should match (logical OR), as name:value
    #[arg(short = 'S', long = "should")]
    should: Vec<NameValue>,

    /// Date range bound on the time field, as gte:DATE or lte:DATE
    #[arg(short = 'D', long = "date-range")]
    date_range: Vec<NameValue>,

    /// Keep only these returned fields
    #[arg(short = 'F', long = "field")]
    fields: Vec<String>,

    /// Flatten nested objects into parent_child columns
    #[arg(short = 'B', long)]
    flatten: bool,

    /// Add the fsdb header line
    #[arg(short = 'H', long = "header")]
    add_header: bool,

    /// Use HTTPS without verifying certificates
    #[arg(short = 'I', long)]
    insecure: bool,

    /// Use the `es` prefix in the URL
    #[arg(short = 'U', long)]
    url_prefix: bool,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct JoinArgs {
    /// Input fsdb file; repeatable
    #[arg(short, long = "input", required = true)]
    infiles: Vec<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Sort rows by this column and move it to the front
    #[arg(short, long)]
    sort_key: Option<String>,

    /// Add the fsdb header line
    #[arg(short = 'H', long = "header")]
    add_header: bool,

    /// Domain column to split on the public suffix list; repeatable
    #[arg(short, long = "psl-key")]
    psl_keys: Vec<String>,

    /// Also emit merged psl columns across all keys
    #[arg(short = 'M', long)]
    psl_merged: bool,
}

#[derive(Debug, Args)]
struct BatchArgs {
    /// Read topics from the beginning instead of the saved group offset
    #[arg(short, long)]
    beginning: bool,

    /// Time window in seconds; default one day
    #[arg(short = 't', long)]
    window_secs: Option<u64>,

    /// Kafka group id used to track the last pull
    #[arg(short, long)]
    group_id: Option<String>,

    /// Maximum messages to pull per topic, for debugging; 0 means drain
    #[arg(short, long, default_value_t = 0)]
    max: u64,

    /// Print rollups to stdout instead of producing to Kafka
    #[arg(short, long)]
    debug: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn finish(report: CommandReport) -> Result<()> {
    for detail in &report.details {
        println!("  {detail}");
    }
    if !report.ok {
        for issue in &report.issues {
            eprintln!("issue: {issue}");
        }
        bail!("{} completed with {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;

    let report = match cli.command {
        Command::Mirror(args) => {
            let opts = mirror::MirrorOptions {
                hosts: args.hosts,
                local_port: args.lport,
                remote_port: args.rport,
                num: args.num,
                list_only: args.list,
                prefix: args.prefix,
                filter: args.filter.to_filter(),
                verbose: args.verbose,
            };
            mirror::run(&opts, &cfg)?
        }
        Command::MirrorRange(args) => {
            let opts = mirror_range::MirrorRangeOptions {
                sensors: args.sensors,
                start_date: args.start_date,
                end_date: args.end_date,
                local_port: args.lport,
                remote_port: args.rport,
                verbose: args.verbose,
            };
            mirror_range::run(&opts, &cfg)?
        }
        Command::Dump(args) => {
            let opts = dump::DumpOptions {
                dump_dir: args.dump_dir,
                prefix: args.prefix,
                list_only: args.list,
                filter: args.filter.to_filter(),
                verbose: args.verbose,
            };
            dump::run(&opts)?
        }
        Command::Export(args) => {
            let opts = export::ExportOptions {
                host: args.eshost,
                port: args.esport,
                index: args.index,
                size: args.size,
                query: BoolQuery {
                    must: args.must,
                    must_not: args.must_not,
                    should: args.should,
                    date_range: args.date_range,
                    time_field: args.time_field,
                },
                fields: args.fields,
                flatten: args.flatten,
                add_header: args.add_header,
                insecure: args.insecure,
                url_prefix: args.url_prefix,
                outfile: args.out,
            };
            export::run(&opts, &cfg)?
        }
        Command::Join(args) => {
            let opts = join::JoinOptions {
                infiles: args.infiles,
                outfile: args.out,
                sort_key: args.sort_key,
                add_header: args.add_header,
                psl_keys: args.psl_keys,
                psl_merged: args.psl_merged,
            };
            join::run(&opts)?
        }
        Command::Batch(args) => {
            let opts = batch::BatchOptions {
                beginning: args.beginning,
                window_secs: args.window_secs,
                group_id: args.group_id,
                max: args.max,
                debug: args.debug,
                verbose: args.verbose,
            };
            batch::run(&opts, &cfg)?
        }
    };

    finish(report)
}
