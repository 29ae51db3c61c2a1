use std::env;

use diffusion::{Corpus, DiffusionConfig, DiffusionTrainer};
use diffusion_core::Tokenizer;
use log::info;
use model::PositionalModel;

/// Half width of the range the model's logits start in.
const INIT_SCALE: f32 = 0.1;

/// Amount of sentences printed once training is done.
const GENERATIONS: usize = 5;

const DEFAULT_CORPUS: &[&str] = &[
    "the cat sat on the mat",
    "the dog sat on the rug",
    "a cat chased the mouse",
    "a dog chased the cat",
    "the bird sang a song",
    "the mouse ate the cheese",
    "a bird flew over the house",
    "the dog ate the bone",
];

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Usage: text-diffusion [config.json] [corpus.txt]
    let mut args = env::args().skip(1);

    let config = match args.next() {
        Some(path) => DiffusionConfig::load(&path)?,
        None => DiffusionConfig::default(),
    };

    let sentences = match args.next() {
        Some(path) => Corpus::read_sentences(&path)?,
        None => DEFAULT_CORPUS.iter().map(|s| s.to_string()).collect(),
    };

    let tokenizer = Tokenizer::from_corpus(&sentences);
    let corpus = Corpus::encode(&tokenizer, &sentences, config.max_length);
    info!(
        sentences = corpus.len(),
        vocab_size = tokenizer.vocab_size();
        "corpus loaded"
    );

    let mut rng = config.rng();
    let model = PositionalModel::new(
        config.max_length,
        tokenizer.vocab_size(),
        INIT_SCALE,
        &mut rng,
    )?;

    let mut trainer = DiffusionTrainer::new(model, tokenizer, config, rng);
    let stats = trainer.train(&corpus)?;

    if let (Some(first), Some(last)) = (stats.first(), stats.last()) {
        info!(first = first.loss(), last = last.loss(); "training finished");
    }

    for _ in 0..GENERATIONS {
        println!("{}", trainer.generate_text()?);
    }

    Ok(())
}
