use std::collections::{HashSet, VecDeque};
use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context};
use colored::Colorize;
use odb_graph::{CommitGraph, NodeFlags};
use odb_object::{Commit, Object, ObjectSource, Signature};
use odb_pack::{EntryKind, Pack, VerifyReport};
use odb_repo::{Ref, RefTarget, RepoConfig, Repository};
use odb_types::ObjectId;
use serde_json::{json, Value};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let repo = open_repository(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::CatFile(args) => cmd_cat_file(&repo, format, args),
        Command::RevParse(args) => cmd_rev_parse(&repo, format, args),
        Command::ShowRef => cmd_show_ref(&repo, format),
        Command::ShowPack(args) => cmd_show_pack(&repo, format, args),
        Command::ShowDelta(args) => cmd_show_delta(&repo, format, args),
        Command::VerifyPack(args) => cmd_verify_pack(&repo, format, args),
        Command::GraphCommon(args) => cmd_graph_common(&repo, format, args),
        Command::MergeBase(args) => cmd_merge_base(&repo, format, args),
        Command::Log(args) => cmd_log(&repo, format, args),
    }
}

fn open_repository(cli: &Cli) -> anyhow::Result<Repository> {
    let config = match &cli.config {
        Some(path) => RepoConfig::load(path)?,
        None => RepoConfig::default(),
    };
    let git_dir = cli
        .git_dir
        .clone()
        .or_else(|| std::env::var_os("GIT_DIR").map(PathBuf::from));
    match git_dir {
        Some(dir) => Repository::open(&dir, config)
            .with_context(|| format!("cannot open {}", dir.display())),
        None => {
            let cwd = std::env::current_dir()?;
            Ok(Repository::discover(&cwd, config)?)
        }
    }
}

fn emit(value: Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// `1234abcd` and `pack-1234abcd.idx` both name `pack-1234abcd`.
fn pack_file_name(name: &str) -> String {
    let name = name
        .strip_suffix(".idx")
        .or_else(|| name.strip_suffix(".pack"))
        .unwrap_or(name);
    if name.starts_with("pack-") {
        name.to_string()
    } else {
        format!("pack-{name}")
    }
}

fn open_pack(repo: &Repository, name: &str) -> anyhow::Result<Pack> {
    let base = repo.objects_dir().join("pack").join(pack_file_name(name));
    Pack::open_with(&base, repo.config().pack_options())
        .with_context(|| format!("cannot open pack {}", base.display()))
}

fn signature_line(sig: &Signature) -> String {
    match sig.when() {
        Some(when) => format!("{} <{}> {}", sig.name, sig.email, when.to_rfc2822()),
        None => sig.to_string(),
    }
}

// ---------------------------------------------------------------
// Objects
// ---------------------------------------------------------------

fn cmd_cat_file(repo: &Repository, format: OutputFormat, args: CatFileArgs) -> anyhow::Result<()> {
    let id = repo.resolve(&args.object)?;
    let object = repo.open_object(&id)?;
    match format {
        OutputFormat::Json => emit(object_json(id, object)?),
        OutputFormat::Text => print_object(object),
    }
}

fn object_json(id: ObjectId, object: Object) -> anyhow::Result<Value> {
    Ok(match object {
        Object::Commit(commit) => json!({
            "id": id,
            "type": "commit",
            "size": commit.size,
            "tree": commit.tree,
            "parents": commit.parents,
            "author": commit.author.to_string(),
            "committer": commit.committer.to_string(),
            "message": commit.message,
        }),
        Object::Tree(tree) => {
            let size = tree.size();
            let mut entries = Vec::new();
            for entry in tree {
                let entry = entry?;
                entries.push(json!({
                    "mode": format!("{:06o}", entry.mode),
                    "type": entry.kind.name(),
                    "id": entry.id,
                    "name": entry.name,
                }));
            }
            json!({ "id": id, "type": "tree", "size": size, "entries": entries })
        }
        Object::Blob(blob) => {
            let size = blob.size();
            let bytes = blob.into_bytes()?;
            json!({
                "id": id,
                "type": "blob",
                "size": size,
                "content": String::from_utf8_lossy(&bytes),
            })
        }
        Object::Tag(tag) => json!({
            "id": id,
            "type": "tag",
            "size": tag.size,
            "object": tag.object,
            "object_type": tag.target_kind.name(),
            "tag": tag.name,
            "tagger": tag.tagger.as_ref().map(Signature::to_string),
            "message": tag.message,
        }),
    })
}

fn print_object(object: Object) -> anyhow::Result<()> {
    match object {
        Object::Commit(commit) => {
            println!("{} [{}]", "Commit".bold(), commit.size);
            println!(" └┬─ tree:      {}", commit.tree);
            for parent in &commit.parents {
                println!("  ├─ parent:    {parent}");
            }
            println!("  ├─ author:    {}", commit.author);
            println!("  ├─ committer: {}", commit.committer);
            println!("  └─ message:   [{}]", commit.summary());
        }
        Object::Tree(tree) => {
            println!("{} [{}]", "Tree".bold(), tree.size());
            for entry in tree {
                let entry = entry?;
                println!(
                    " ├─ {:08o} {:<7} {} {}",
                    entry.mode,
                    entry.kind.name(),
                    entry.id,
                    entry.name
                );
            }
        }
        Object::Blob(mut blob) => {
            eprintln!("{} [{}]", "Blob".bold(), blob.size());
            io::copy(&mut blob, &mut io::stdout().lock())?;
        }
        Object::Tag(tag) => {
            println!("{} [{}]", "Tag".bold(), tag.size);
            println!(" └┬─ object:    {}", tag.object);
            println!("  ├─ type:      {}", tag.target_kind);
            println!("  ├─ tag:       {}", tag.name);
            if let Some(tagger) = &tag.tagger {
                println!("  ├─ tagger:    {tagger}");
            }
            println!("  └─ message:   [{}]", tag.message.lines().next().unwrap_or(""));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------
// Refs
// ---------------------------------------------------------------

fn cmd_rev_parse(repo: &Repository, format: OutputFormat, args: RevParseArgs) -> anyhow::Result<()> {
    let (found, id) = repo.rev_parse(&args.name)?;
    let symbol = found.as_ref().and_then(|r| match &r.target {
        RefTarget::Symbolic(target) => Some(target.clone()),
        RefTarget::Direct(_) => None,
    });
    match format {
        OutputFormat::Json => emit(json!({
            "name": found.as_ref().map(Ref::short_name),
            "full": found.as_ref().map(|r| r.name.as_str()),
            "symbolic": symbol,
            "id": id,
        })),
        OutputFormat::Text => {
            println!("{}", args.name.bold());
            match &found {
                Some(found) => {
                    println!(" └┬─ name: {}", found.short_name());
                    println!("  ├─ full: {}", found.name);
                }
                None => println!(" └┬─ name: (object id)"),
            }
            if let Some(symbol) = symbol {
                println!("  ├─ ref:  {}", symbol.cyan());
            }
            println!("  └─ SHA1: {}", id.to_string().yellow());
            Ok(())
        }
    }
}

fn cmd_show_ref(repo: &Repository, format: OutputFormat) -> anyhow::Result<()> {
    let refs = repo.list_refs()?;
    match format {
        OutputFormat::Json => emit(Value::Array(
            refs.iter()
                .map(|r| match &r.target {
                    RefTarget::Direct(id) => json!({ "name": r.name, "id": id }),
                    RefTarget::Symbolic(target) => json!({ "name": r.name, "symbolic": target }),
                })
                .collect(),
        )),
        OutputFormat::Text => {
            for r in refs {
                match r.target {
                    RefTarget::Direct(id) => println!("{} {}", id.to_string().yellow(), r.name),
                    RefTarget::Symbolic(target) => println!("{} {}", format!("ref: {target}").cyan(), r.name),
                }
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------
// Packs
// ---------------------------------------------------------------

fn cmd_show_pack(repo: &Repository, format: OutputFormat, args: ShowPackArgs) -> anyhow::Result<()> {
    let pack = open_pack(repo, &args.pack)?;
    let index = pack.index();

    let mut rows = Vec::with_capacity(index.len());
    for (pos, id) in index.iter() {
        let offset = index.offset(pos)?;
        let entry = pack.file().entry_at(offset)?;
        rows.push((id, index.crc32(pos)?, entry));
    }

    if format == OutputFormat::Json {
        let objects: Vec<Value> = rows
            .iter()
            .map(|(id, crc, entry)| {
                json!({
                    "id": id,
                    "offset": entry.offset,
                    "size": entry.size,
                    "type": entry.kind.to_string(),
                    "crc32": crc,
                })
            })
            .collect();
        return emit(json!({
            "path": pack.path().display().to_string(),
            "index_version": index.version(),
            "objects": objects,
        }));
    }

    println!(
        "{} (index v{}, {} objects)",
        pack.path().display().to_string().bold(),
        index.version(),
        index.len()
    );
    let mut bucket = None;
    for (id, _, entry) in &rows {
        if bucket != Some(id.first_byte()) {
            bucket = Some(id.first_byte());
            println!("├─[{:02x}]", id.first_byte());
        }
        let kind = match entry.kind {
            EntryKind::Object(kind) => kind.to_string().normal(),
            other => other.to_string().yellow(),
        };
        println!("│  ├─ {} {:>10} [{}] {}", id, entry.offset, entry.size, kind);
    }
    Ok(())
}

fn cmd_show_delta(repo: &Repository, format: OutputFormat, args: ShowDeltaArgs) -> anyhow::Result<()> {
    let pack = open_pack(repo, &args.pack)?;
    let id = ObjectId::from_hex(&args.id).context("invalid object id")?;
    let offset = pack.index().find_offset(&id)?;
    let description = pack.describe(offset)?;
    let entry = description.entry;
    let Some(delta) = description.delta else {
        bail!("object {id} is a {} entry, not a delta", entry.kind);
    };

    if format == OutputFormat::Json {
        let base = match entry.kind {
            EntryKind::OfsDelta { base_offset } => json!({ "offset": base_offset }),
            EntryKind::RefDelta { base } => json!({ "id": base }),
            EntryKind::Object(_) => Value::Null,
        };
        let ops: Vec<String> = delta.ops.iter().map(ToString::to_string).collect();
        return emit(json!({
            "id": id,
            "offset": entry.offset,
            "size": entry.size,
            "base": base,
            "source_size": delta.source_size,
            "target_size": delta.target_size,
            "ops": ops,
        }));
    }

    println!("{} [{}]", "Delta".bold(), entry.size);
    match entry.kind {
        EntryKind::OfsDelta { base_offset } => println!("   ├─ off: {base_offset}"),
        EntryKind::RefDelta { base } => println!("   ├─ ref: {base}"),
        EntryKind::Object(_) => {}
    }
    println!("   ├─ source size: {}", delta.source_size);
    println!("   ├─ target size: {}", delta.target_size);
    println!("   └┬─ Instructions");
    for op in &delta.ops {
        println!("    ├─ {op}");
    }
    Ok(())
}

fn cmd_verify_pack(repo: &Repository, format: OutputFormat, args: VerifyPackArgs) -> anyhow::Result<()> {
    let reports: Vec<VerifyReport> = match &args.pack {
        Some(name) => vec![open_pack(repo, name)?.verify()?],
        None => repo
            .packs()
            .packs()
            .iter()
            .map(Pack::verify)
            .collect::<Result<_, _>>()?,
    };
    let failed = reports.iter().filter(|r| !r.is_ok()).count();

    match format {
        OutputFormat::Json => {
            let packs: Vec<Value> = reports
                .iter()
                .map(|r| {
                    json!({
                        "path": r.path.display().to_string(),
                        "objects": r.objects,
                        "checksum_ok": r.checksum_ok,
                        "index_matches_pack": r.index_matches_pack,
                        "crc_checked": r.crc_checked,
                        "crc_mismatches": r.crc_mismatches,
                        "hash_checked": r.hash_checked,
                        "hash_mismatches": r.hash_mismatches,
                        "ok": r.is_ok(),
                    })
                })
                .collect();
            emit(Value::Array(packs))?;
        }
        OutputFormat::Text => {
            for report in &reports {
                let status = if report.is_ok() {
                    "ok".green().bold()
                } else {
                    "FAILED".red().bold()
                };
                println!(
                    "{status} {} ({} objects, {} crc checked, {} hashed)",
                    report.path.display(),
                    report.objects,
                    report.crc_checked,
                    report.hash_checked
                );
                if !report.checksum_ok {
                    println!("  pack checksum does not match contents");
                }
                if !report.index_matches_pack {
                    println!("  index names a different pack");
                }
                for id in &report.crc_mismatches {
                    println!("  crc mismatch: {id}");
                }
                for id in &report.hash_mismatches {
                    println!("  content mismatch: {id}");
                }
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} packs failed verification", reports.len());
    }
    Ok(())
}

// ---------------------------------------------------------------
// History
// ---------------------------------------------------------------

/// Graphviz source for the painted part of `graph`, breadth-first from
/// `starts`. Labels carry the colour bits.
fn render_dot<S: ObjectSource>(graph: &CommitGraph<S>, starts: &[ObjectId]) -> String {
    let mut out = String::from("digraph g1 {\n");
    let mut seen = HashSet::new();
    let mut queue: VecDeque<ObjectId> = starts.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        let Some(node) = graph.node(&id) else {
            continue;
        };
        out.push_str(&format!(
            "\"{id}\" [label=\"{} ({})\"];\n",
            id.short_hex(),
            node.flags.colors().bits()
        ));
        for parent in node.parents().unwrap_or_default() {
            out.push_str(&format!("\"{id}\" -> \"{parent}\";\n"));
            queue.push_back(*parent);
        }
    }
    out.push_str("}\n");
    out
}

fn cmd_graph_common(repo: &Repository, format: OutputFormat, args: GraphCommonArgs) -> anyhow::Result<()> {
    let base = repo.resolve(&args.base)?;
    let reference = repo.resolve(&args.reference)?;

    let mut graph = repo.commit_graph();
    graph.add_tip_with_flags(base, NodeFlags::RED)?;
    graph.add_tip_with_flags(reference, NodeFlags::GREEN)?;
    let common = graph
        .paint_down_to_common()
        .context("error building graph")?;

    match format {
        OutputFormat::Json => {
            let nodes: Vec<Value> = graph
                .nodes()
                .map(|node| {
                    json!({
                        "id": node.id,
                        "flags": node.flags.colors().bits(),
                        "parents": node.parents(),
                    })
                })
                .collect();
            emit(json!({
                "base": base,
                "ref": reference,
                "common": common,
                "nodes": nodes,
            }))
        }
        OutputFormat::Text => {
            print!("{}", render_dot(&graph, &[base, reference]));
            Ok(())
        }
    }
}

fn cmd_merge_base(repo: &Repository, format: OutputFormat, args: MergeBaseArgs) -> anyhow::Result<()> {
    let a = repo.resolve(&args.a)?;
    let b = repo.resolve(&args.b)?;
    let candidates = repo.merge_base_candidates(&a, &b)?;
    match format {
        OutputFormat::Json => emit(json!(candidates)),
        OutputFormat::Text => {
            if candidates.is_empty() {
                bail!("no common history between {a} and {b}");
            }
            for id in candidates {
                println!("{id}");
            }
            Ok(())
        }
    }
}

fn cmd_log(repo: &Repository, format: OutputFormat, args: LogArgs) -> anyhow::Result<()> {
    let tip = repo.resolve(&args.rev)?;
    let mut graph = repo.commit_graph();
    graph.add_tip(tip)?;

    let mut entries: Vec<(ObjectId, Commit)> = Vec::new();
    let limit = args.limit;
    graph.visit_commits(|node| {
        if limit == 0 {
            return true;
        }
        entries.push((node.id, node.commit.clone()));
        entries.len() >= limit
    })?;

    if format == OutputFormat::Json {
        let commits: Vec<Value> = entries
            .iter()
            .map(|(id, commit)| {
                json!({
                    "id": id,
                    "parents": commit.parents,
                    "author": commit.author.to_string(),
                    "summary": commit.summary(),
                })
            })
            .collect();
        return emit(Value::Array(commits));
    }

    for (id, commit) in &entries {
        if args.oneline {
            println!("{} {}", id.short_hex().yellow(), commit.summary());
            continue;
        }
        println!("{}", format!("commit {id}").yellow());
        if commit.parents.len() > 1 {
            let parents: Vec<String> = commit.parents.iter().map(ObjectId::short_hex).collect();
            println!("Merge:  {}", parents.join(" "));
        }
        println!("Author: {}", signature_line(&commit.author));
        println!();
        for line in commit.message.lines() {
            println!("    {line}");
        }
        println!();
    }
    Ok(())
}
