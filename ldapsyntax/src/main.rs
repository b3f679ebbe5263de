mod arguments;

use std::fs;
use std::io::{self, Read, Write};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use arguments::{Cmdline, Command, DnCommand, LdifCommand};
use ldapsyntax::dn::{parse_distinguished_name, DistinguishedName};
use ldapsyntax::ldif;
use ldapsyntax::print::print_ldif;
use ldapsyntax::records::LdifFile;

fn main() {
    let cmdline = Cmdline::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(cmdline.log_level().into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let result = match &cmdline.command {
        Command::Dn(cmd) => run_dn(cmd),
        Command::Ldif(cmd) => run_ldif(cmd),
    };

    if let Err(e) = result {
        eprintln!("ldapsyntax: {:#}", e);
        process::exit(1);
    }
}

fn run_dn(cmd: &DnCommand) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for name in &cmd.names {
        if cmd.tree || cmd.shape {
            let tree = parse_distinguished_name(cmd.variant, name)
                .with_context(|| format!("invalid {} DN {:?}", cmd.variant, name))?;
            if cmd.tree {
                write!(out, "{}", tree)?;
            } else {
                writeln!(out, "{}", tree.root().shape())?;
            }
        } else {
            let dn = DistinguishedName::parse(cmd.variant, name)
                .with_context(|| format!("invalid {} DN {:?}", cmd.variant, name))?;
            writeln!(out, "{}", dn)?;
        }
    }
    Ok(())
}

fn read_source(cmd: &LdifCommand) -> Result<(String, String)> {
    match cmd.input_path() {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok((path.display().to_string(), source))
        }
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("failed to read stdin")?;
            Ok(("<stdin>".to_string(), source))
        }
    }
}

fn run_ldif(cmd: &LdifCommand) -> Result<()> {
    let (name, source) = read_source(cmd)?;
    let text = ldif::normalize(&source);
    let tree = ldif::parse_ldif_file(&text).with_context(|| format!("{}: invalid LDIF", name))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cmd.tree {
        write!(out, "{}", tree)?;
        return Ok(());
    }

    let file = LdifFile::from_tree(&tree).with_context(|| format!("{}: invalid LDIF", name))?;
    tracing::info!(file = %name, records = file.len(), "parsed");

    if let Some(variant) = cmd.decode_dns {
        for dn in file.dns() {
            DistinguishedName::parse(variant, dn)
                .with_context(|| format!("{}: invalid {} DN {:?}", name, variant, dn))?;
        }
    }

    if cmd.check {
        writeln!(out, "{}: {} records", name, file.len())?;
    } else {
        print_ldif(&mut out, &file)?;
    }
    Ok(())
}
