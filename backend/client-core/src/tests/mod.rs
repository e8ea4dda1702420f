mod handshake;
mod lockfile;
mod navigation;
mod supervisor;
