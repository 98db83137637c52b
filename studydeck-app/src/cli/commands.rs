use crate::cli::opts::*;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use std::io::{stdin, stdout, Write};
use std::path::PathBuf;
use std::sync::Arc;
use studydeck_core::{
    filter_by_state, matches_text, preview, Card, CardStore, Deck, NewCard, Rating,
};
use studydeck_json::paths::default_store_file;
use studydeck_json::JsonStore;
use uuid::Uuid;

pub async fn run_cli(args: Cli) -> Result<()> {
    let store = open_store(args.store_file.clone(), args.backups_dir.clone(), args.max_backups).await?;
    let deck = Deck::load(&*store).await?;

    match args.cmd {
        Command::Add(a) => add_cmd(&*store, deck, a).await,
        Command::Import(cmd) => import_cmd(&*store, deck, cmd).await,
        Command::Export(cmd) => export_cmd(&deck, cmd),
        Command::List(cmd) => {
            list_cmd(&deck, cmd);
            Ok(())
        }
        Command::Due { max } => {
            due_cmd(&deck, max);
            Ok(())
        }
        Command::Stats => {
            let s = deck.stats(Utc::now());
            println!(
                "total={}\tdue={}\tnew={}\tlearning={}\treview={}\trelearning={}",
                s.total, s.due, s.new, s.learning, s.review, s.relearning
            );
            Ok(())
        }
        Command::Review(cmd) => review_cmd(&*store, deck, cmd).await,
        Command::Preview { card_id } => preview_cmd(&deck, &card_id),
        Command::Rm { card_id } => {
            let mut deck = deck;
            let id = parse_uuid(&card_id)?;
            deck.remove(id)?;
            deck.save(&*store).await?;
            println!("ok");
            Ok(())
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("refusing to remove {} cards without --yes", deck.len());
            }
            let mut deck = deck;
            deck.clear();
            deck.save(&*store).await?;
            println!("ok");
            Ok(())
        }
    }
}

pub async fn open_store(
    store_file: Option<PathBuf>,
    backups_dir: Option<PathBuf>,
    max_backups: usize,
) -> Result<Arc<dyn CardStore>> {
    let (default_file, default_backups) = default_store_file();
    let backups = backups_dir.unwrap_or_else(|| match &store_file {
        Some(f) => f.with_extension("backups"),
        None => default_backups,
    });
    let file = store_file.unwrap_or(default_file);
    let s = JsonStore::open_with(file, backups, max_backups).await?;
    Ok(Arc::new(s))
}

fn ladder_deck(deck: Deck, ladder: &LadderOpts) -> Result<Deck> {
    if ladder.steps.is_empty() {
        return Ok(deck);
    }
    Ok(deck.with_learning_steps(ladder.steps.clone())?)
}

async fn add_cmd(store: &dyn CardStore, deck: Deck, a: CardAdd) -> Result<()> {
    let mut deck = ladder_deck(deck, &a.ladder)?;
    let id = deck.add_card(NewCard::new(a.question, a.answer), Utc::now());
    deck.save(store).await?;
    println!("{id}");
    Ok(())
}

async fn import_cmd(store: &dyn CardStore, deck: Deck, cmd: ImportCmd) -> Result<()> {
    let (records, ladder) = match cmd {
        ImportCmd::Json { path, ladder } => {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let records: Vec<NewCard> = serde_json::from_str(&data)?;
            (records, ladder)
        }
        ImportCmd::Csv { path, ladder } => {
            let mut rdr = csv::Reader::from_path(&path)?;
            let mut records = Vec::new();
            for rec in rdr.records() {
                let rec = rec?;
                let question = rec.get(0).unwrap_or("").trim().to_string();
                let answer = rec.get(1).unwrap_or("").trim().to_string();
                if question.is_empty() {
                    continue;
                }
                records.push(NewCard::new(question, answer));
            }
            (records, ladder)
        }
    };

    let mut deck = ladder_deck(deck, &ladder)?;
    let n = deck.add_cards(records, Utc::now()).len();
    deck.save(store).await?;
    println!("imported {n}");
    Ok(())
}

fn export_cmd(deck: &Deck, cmd: ExportCmd) -> Result<()> {
    match cmd {
        ExportCmd::Json { path } => {
            let s = serde_json::to_string_pretty(deck.cards())?;
            std::fs::write(&path, s)?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn print_card(c: &Card) {
    println!(
        "{}\t{}\t{}\tstate={}\tinterval={}d\tease={:.2}\tnext={}",
        c.id,
        c.question,
        c.answer,
        c.state().label(),
        c.interval(),
        c.ease_factor(),
        c.next_review().to_rfc3339()
    );
}

fn select_cards<'a>(deck: &'a Deck, cmd: &ListCmd) -> Vec<&'a Card> {
    let mut cards = match cmd.state {
        Some(state) => filter_by_state(deck.cards(), state.into()),
        None => deck.cards().iter().collect(),
    };
    if let Some(q) = &cmd.query {
        cards.retain(|c| matches_text(c, q));
    }
    cards
}

fn list_cmd(deck: &Deck, cmd: ListCmd) {
    for c in select_cards(deck, &cmd) {
        print_card(c);
    }
}

fn due_cmd(deck: &Deck, max: Option<usize>) {
    let due = deck.due_cards(Utc::now());
    if due.is_empty() {
        println!("no cards due");
        return;
    }
    for c in due.into_iter().take(max.unwrap_or(usize::MAX)) {
        print_card(c);
    }
}

fn preview_cmd(deck: &Deck, card_id: &str) -> Result<()> {
    let id = parse_uuid(card_id)?;
    let card = deck.get(id).ok_or_else(|| anyhow!("card not found: {card_id}"))?;
    println!("Q: {}", card.question);
    for (rating, info) in preview(card, Utc::now()) {
        println!(
            "{}={}\t{}\tinterval={}d\tease={:.2}",
            u8::from(rating),
            rating.label(),
            info.time_string,
            info.interval,
            info.ease_factor
        );
    }
    Ok(())
}

async fn review_cmd(store: &dyn CardStore, mut deck: Deck, cmd: ReviewCmd) -> Result<()> {
    let ids: Vec<Uuid> = deck
        .due_cards(Utc::now())
        .iter()
        .take(cmd.max)
        .map(|c| c.id)
        .collect();
    if ids.is_empty() {
        println!("no cards due");
        return Ok(());
    }

    let total = ids.len();
    let mut count = 0usize;
    for id in ids {
        let Some(card) = deck.get(id) else { continue };
        count += 1;
        println!("\n[{}/{}] {}", count, total, card.id);
        println!("Q: {}", card.question);
        prompt_enter("[enter=show]")?;
        println!("A: {}", card.answer);

        let hints: Vec<String> = preview(card, Utc::now())
            .iter()
            .map(|(r, info)| format!("{}={} ({})", u8::from(*r), r.label(), info.time_string))
            .collect();
        println!("[{}, s=skip, q=quit]", hints.join(", "));

        let rating = loop {
            let line = read_line("rating> ")?;
            match line.trim().to_lowercase().as_str() {
                "s" | "skip" => break None,
                "q" | "quit" => return Ok(()),
                other => match parse_rating(other) {
                    Some(r) => break Some(r),
                    None => println!("enter 1-4, s, or q"),
                },
            }
        };

        if let Some(rating) = rating {
            let info = deck.answer(id, rating, Utc::now())?;
            deck.save(store).await?;
            println!("→ next review in {} ({})", info.time_string, info.state.label());
        }
    }

    println!("\nreviewed {}", count);
    Ok(())
}

fn parse_rating(s: &str) -> Option<Rating> {
    s.parse::<u8>().ok().and_then(|n| Rating::try_from(n).ok())
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|_| anyhow!("invalid card id: {s}"))
}

fn prompt_enter(label: &str) -> Result<()> {
    print!("{label}");
    stdout().flush().ok();
    let mut s = String::new();
    stdin().read_line(&mut s)?;
    Ok(())
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    stdout().flush().ok();
    let mut s = String::new();
    stdin().read_line(&mut s)?;
    Ok(s)
}
